//! Mixer/Device mode state machine
//!
//! Decides how strip sliders, knobs and buttons are interpreted. The observer
//! sees the initial state right after construction and every effective
//! transition afterwards.

use std::fmt;
use tracing::debug;

/// Interpretation of the channel strips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Strips drive track volume, pan, solo, mute, arm, select
    #[default]
    Mixer,
    /// Strips drive the primary device's macros and parameters
    Device,
}

impl Mode {
    pub fn toggled(&self) -> Self {
        match self {
            Mode::Mixer => Mode::Device,
            Mode::Device => Mode::Mixer,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Mixer => write!(f, "Mixer Mode"),
            Mode::Device => write!(f, "Device Mode"),
        }
    }
}

/// Callback invoked on mode transitions
pub type ModeObserver = Box<dyn FnMut(Mode)>;

pub struct ModeStateMachine {
    current: Mode,
    observer: ModeObserver,
}

impl ModeStateMachine {
    /// Create the machine in Mixer mode and report that state to the observer
    pub fn new(observer: impl FnMut(Mode) + 'static) -> Self {
        let mut machine = Self {
            current: Mode::Mixer,
            observer: Box::new(observer),
        };
        machine.emit();
        machine
    }

    pub fn current(&self) -> Mode {
        self.current
    }

    /// Flip between Mixer and Device
    pub fn switch_mode(&mut self) {
        self.set_mode(self.current.toggled());
    }

    /// Move to `mode`; a no-op when already there
    pub fn set_mode(&mut self, mode: Mode) {
        if self.current == mode {
            return;
        }
        self.current = mode;
        self.emit();
    }

    fn emit(&mut self) {
        debug!("Mode: {}", self.current);
        (self.observer)(self.current);
    }
}

impl fmt::Debug for ModeStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeStateMachine")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorded() -> (Rc<RefCell<Vec<Mode>>>, impl FnMut(Mode) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |mode| sink.borrow_mut().push(mode))
    }

    #[test]
    fn test_initial_state_is_emitted() {
        let (seen, observer) = recorded();
        let machine = ModeStateMachine::new(observer);
        assert_eq!(machine.current(), Mode::Mixer);
        assert_eq!(*seen.borrow(), vec![Mode::Mixer]);
    }

    #[test]
    fn test_switch_mode_is_a_two_cycle() {
        let (seen, observer) = recorded();
        let mut machine = ModeStateMachine::new(observer);
        seen.borrow_mut().clear();

        machine.switch_mode();
        assert_eq!(machine.current(), Mode::Device);
        machine.switch_mode();
        assert_eq!(machine.current(), Mode::Mixer);

        assert_eq!(*seen.borrow(), vec![Mode::Device, Mode::Mixer]);
    }

    #[test]
    fn test_set_mode_is_idempotent() {
        let (seen, observer) = recorded();
        let mut machine = ModeStateMachine::new(observer);

        machine.set_mode(Mode::Mixer);
        machine.set_mode(Mode::Device);
        machine.set_mode(Mode::Device);

        assert_eq!(*seen.borrow(), vec![Mode::Mixer, Mode::Device]);
    }
}
