//! Event dispatcher - turns control events into host commands
//!
//! Owns the chord latches (Shift, Stop, Play, Rec), the Mixer/Device mode and
//! the panel layout toggle. Every utility button event updates the latches
//! first; only presses trigger actions. Release events are consumed for latch
//! tracking and otherwise ignored.


use tracing::{debug, info, trace};

use crate::control_map::{
    map_to_control_event, ButtonState, ChannelControl, ControlEvent, JogDirection, UtilityButton,
};
use crate::host::{
    ApplicationCommand, ArrangerCommand, CursorTrackCommand, DeviceCommand, Host, HostCommand,
    PanelLayout, ScaledValue, TrackCommand, TransportCommand,
};
use crate::jog::handle_jog;
use crate::mode::{Mode, ModeStateMachine};

/// Live press state of the buttons that combine into chords
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChordState {
    /// Back button held
    pub shift: bool,
    pub stop: bool,
    pub play: bool,
    pub rec: bool,
}

impl ChordState {
    /// Latch on press, clear on release
    pub fn update(&mut self, button: UtilityButton, state: ButtonState) {
        let pressed = state.is_pressed();
        match button {
            UtilityButton::Back => self.shift = pressed,
            UtilityButton::Stop => self.stop = pressed,
            UtilityButton::Play => self.play = pressed,
            UtilityButton::Rec => self.rec = pressed,
            _ => {},
        }
    }

    /// Stop + Play + Rec held together
    pub fn engine_chord(&self) -> bool {
        self.stop && self.play && self.rec
    }
}

pub struct EventDispatcher {
    chord: ChordState,
    mode: ModeStateMachine,
    panel_layout: PanelLayout,
}

impl EventDispatcher {
    /// Create a dispatcher in Mixer mode; `mode_observer` sees the initial
    /// mode immediately and every later transition
    pub fn new(mode_observer: impl FnMut(Mode) + 'static) -> Self {
        Self {
            chord: ChordState::default(),
            mode: ModeStateMachine::new(mode_observer),
            panel_layout: PanelLayout::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode.current()
    }

    pub fn chord(&self) -> ChordState {
        self.chord
    }

    pub fn panel_layout(&self) -> PanelLayout {
        self.panel_layout
    }

    /// Parse and dispatch one incoming CC message
    pub fn process_cc(&mut self, cc: u8, value: u8, host: &mut dyn Host) -> ControlEvent {
        let event = map_to_control_event(cc, value);
        if event == ControlEvent::Unrecognized {
            info!("Unknown CC received: cc={} value={}", cc, value);
        } else {
            self.handle_event(event, host);
        }
        event
    }

    /// Dispatch a typed control event
    pub fn handle_event(&mut self, event: ControlEvent, host: &mut dyn Host) {
        trace!("Control event: {:?}", event);

        match event {
            ControlEvent::UtilityButton { button, state } => {
                self.chord.update(button, state);
                if state.is_pressed() {
                    self.on_utility_press(button, host);
                }
            },
            ControlEvent::JogMove {
                direction,
                magnitude,
            } => self.on_jog(direction, magnitude, host),
            ControlEvent::ChannelButton {
                channel,
                control,
                state,
            } => {
                if state.is_pressed() {
                    self.on_channel_press(channel, control, host);
                }
            },
            ControlEvent::ChannelContinuous {
                channel,
                control,
                value,
            } => self.on_channel_value(channel, control, value, host),
            ControlEvent::Unrecognized => info!("Unknown CC received"),
        }
    }

    fn on_utility_press(&mut self, button: UtilityButton, host: &mut dyn Host) {
        let ChordState {
            shift,
            stop,
            play,
            rec,
        } = self.chord;

        if self.chord.engine_chord() {
            if host.engine_active() {
                debug!("Engine chord: audio engine already active");
            } else {
                info!("Engine chord: activating audio engine");
                host.execute(HostCommand::Application(ApplicationCommand::ActivateEngine));
            }
            return;
        }

        let transport = |cmd| Some(HostCommand::Transport(cmd));

        let command = match button {
            // Each transport button only acts while the other two are up, so
            // partial chords never fire a single-button action
            UtilityButton::Play if !stop && !rec => {
                transport(if shift { TransportCommand::TapTempo } else { TransportCommand::Play })
            },
            UtilityButton::Stop if !play && !rec => transport(if shift {
                TransportCommand::ResetAutomationOverrides
            } else {
                TransportCommand::Stop
            }),
            UtilityButton::Rec if !play && !stop => {
                if shift {
                    Some(HostCommand::CursorTrack(CursorTrackCommand::ToggleArm))
                } else {
                    transport(TransportCommand::Record)
                }
            },
            UtilityButton::Play | UtilityButton::Stop | UtilityButton::Rec => {
                debug!("Partial transport chord {:?}, {:?} suppressed", self.chord, button);
                None
            },
            UtilityButton::Cycle => transport(TransportCommand::ToggleArrangerLoop),
            UtilityButton::Set => {
                if shift {
                    self.panel_layout = self.panel_layout.toggled();
                    Some(HostCommand::Application(ApplicationCommand::SetPanelLayout(
                        self.panel_layout,
                    )))
                } else {
                    self.mode.switch_mode();
                    None
                }
            },
            UtilityButton::Rewind => transport(TransportCommand::Rewind),
            UtilityButton::FastForward => {
                if shift {
                    Some(HostCommand::Arranger(ArrangerCommand::TogglePlaybackFollow))
                } else {
                    transport(TransportCommand::FastForward)
                }
            },
            UtilityButton::PrevTrack => Some(HostCommand::CursorTrack(CursorTrackCommand::SelectPrevious)),
            UtilityButton::NextTrack => Some(HostCommand::CursorTrack(if shift {
                CursorTrackCommand::Duplicate
            } else {
                CursorTrackCommand::SelectNext
            })),
            UtilityButton::PrevMarker => transport(if shift {
                TransportCommand::TogglePreRollMetronome
            } else {
                TransportCommand::JumpToPreviousCueMarker
            }),
            UtilityButton::NextMarker => transport(if shift {
                TransportCommand::ToggleMetronome
            } else {
                TransportCommand::JumpToNextCueMarker
            }),
            // Shift only
            UtilityButton::Back => None,
        };

        if let Some(command) = command {
            host.execute(command);
        }
    }

    fn on_jog(&mut self, direction: JogDirection, magnitude: u8, host: &mut dyn Host) {
        let snapshot = host.transport_snapshot();
        for command in handle_jog(direction, magnitude as f64, self.chord.shift, &snapshot) {
            host.execute(HostCommand::Transport(command));
        }
    }

    fn on_channel_press(&mut self, channel: usize, control: ChannelControl, host: &mut dyn Host) {
        if self.mode() == Mode::Device {
            trace!("Device mode: {:?} on channel {} has no binding", control, channel);
            return;
        }

        let command = match control {
            ChannelControl::Solo => TrackCommand::ToggleSolo {
                exclusive: self.chord.shift,
            },
            ChannelControl::Mute => TrackCommand::ToggleMute,
            ChannelControl::Rec => TrackCommand::ToggleArm,
            ChannelControl::Select => TrackCommand::Select,
            ChannelControl::Slider | ChannelControl::Knob => return,
        };

        host.execute(HostCommand::Track {
            index: channel,
            command,
        });
    }

    fn on_channel_value(
        &mut self,
        channel: usize,
        control: ChannelControl,
        value: u8,
        host: &mut dyn Host,
    ) {
        let value = ScaledValue::midi(value);

        let command = match (control, self.mode()) {
            (ChannelControl::Slider, Mode::Mixer) => HostCommand::Track {
                index: channel,
                command: TrackCommand::SetVolume(value),
            },
            (ChannelControl::Slider, Mode::Device) => HostCommand::Device(DeviceCommand::SetMacro {
                index: channel,
                value,
            }),
            (ChannelControl::Knob, Mode::Mixer) => HostCommand::Track {
                index: channel,
                command: TrackCommand::SetPan(value),
            },
            (ChannelControl::Knob, Mode::Device) => HostCommand::Device(DeviceCommand::SetParameter {
                index: channel,
                value,
            }),
            _ => return,
        };

        host.execute(command);
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("chord", &self.chord)
            .field("mode", &self.mode.current())
            .field("panel_layout", &self.panel_layout)
            .finish()
    }
}
