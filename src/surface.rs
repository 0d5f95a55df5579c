//! Surface - wires the dispatcher, scene machine and LED cache together
//!
//! All entry points are synchronous and expect to be driven from a single
//! event loop: raw MIDI from the device, SysEx text, host state changes and
//! the periodic flush/keepalive timers.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::control_map::{ControlEvent, KEEPALIVE_CC};
use crate::dispatcher::EventDispatcher;
use crate::host::{Host, HostStateChange};
use crate::led::LedCache;
use crate::midi::{format_hex, MidiMessage, MidiSink};
use crate::mode::Mode;
use crate::scene::{Scene, SceneStateMachine};
use crate::status;

/// Value sent on the keepalive CC
const KEEPALIVE_VALUE: u8 = 127;

pub struct Surface<S: MidiSink> {
    dispatcher: EventDispatcher,
    scene: SceneStateMachine,
    leds: LedCache<S>,
    /// Mode transitions reported by the dispatcher, applied to the SET LED
    mode_rx: mpsc::UnboundedReceiver<Mode>,
}

impl<S: MidiSink> Surface<S> {
    pub fn new(sink: S) -> Self {
        let (mode_tx, mode_rx) = mpsc::unbounded_channel();
        let dispatcher = EventDispatcher::new(move |mode| {
            let _ = mode_tx.send(mode);
        });
        let scene = SceneStateMachine::new(|scene| debug!("Surface scene: {}", scene));

        let mut surface = Self {
            dispatcher,
            scene,
            leds: LedCache::new(sink),
            mode_rx,
        };
        surface.apply_mode_notices();
        surface
    }

    /// Handle one raw MIDI message from the device
    ///
    /// Only Control Change on status 0xB0 is dispatched; SysEx goes to the
    /// scene machine and everything else is dropped. Returns the control
    /// event for dispatched CCs.
    pub fn on_midi(&mut self, raw: &[u8], host: &mut dyn Host) -> Option<ControlEvent> {
        match MidiMessage::parse(raw) {
            Some(MidiMessage::ControlChange {
                channel: 0,
                cc,
                value,
            }) => {
                let event = self.dispatcher.process_cc(cc, value, host);
                self.apply_mode_notices();
                Some(event)
            },
            Some(MidiMessage::SysEx { data }) => {
                self.scene.process_bytes(&data);
                None
            },
            _ => {
                trace!("Ignoring MIDI from surface: {}", format_hex(raw));
                None
            },
        }
    }

    /// Handle a SysEx payload given as hex text
    pub fn on_sysex(&mut self, hex: &str) -> bool {
        self.scene.process_message(hex)
    }

    /// Mirror a host state change onto the LEDs
    pub fn on_host_state(&mut self, change: &HostStateChange) -> usize {
        status::apply_change(&mut self.leds, change)
    }

    /// Pull the full transport and track state from the host
    pub fn sync_from_host(&mut self, host: &dyn Host) -> usize {
        status::sync_from_host(&mut self.leds, host)
    }

    /// Refresh the strip LEDs from the host after the track bank moved
    pub fn sync_channel_leds(&mut self, host: &dyn Host) -> usize {
        status::sync_channel_leds(&mut self.leds, host)
    }

    /// Re-send every LED
    pub fn flush(&mut self) -> usize {
        self.leds.flush()
    }

    pub fn send_keepalive(&mut self) -> Result<()> {
        self.leds
            .sink_mut()
            .send(&MidiMessage::cc(KEEPALIVE_CC, KEEPALIVE_VALUE))
            .context("Failed to send keepalive")
    }

    pub fn mode(&self) -> Mode {
        self.dispatcher.mode()
    }

    pub fn scene(&self) -> Scene {
        self.scene.current()
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn leds(&self) -> &LedCache<S> {
        &self.leds
    }

    pub fn leds_mut(&mut self) -> &mut LedCache<S> {
        &mut self.leds
    }

    fn apply_mode_notices(&mut self) {
        while let Ok(mode) = self.mode_rx.try_recv() {
            status::apply_mode(&mut self.leds, mode);
        }
    }
}

impl<S: MidiSink> std::fmt::Debug for Surface<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("dispatcher", &self.dispatcher)
            .field("scene", &self.scene)
            .field("leds", &self.leds.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_map::{ButtonState, UtilityButton};
    use crate::host::{ConsoleHost, HostCommand, TransportCommand};
    use crate::midi::RecordingSink;

    fn surface() -> Surface<RecordingSink> {
        Surface::new(RecordingSink::new())
    }

    #[test]
    fn test_starts_in_mixer_on_scene_one() {
        let surface = surface();
        assert_eq!(surface.mode(), Mode::Mixer);
        assert_eq!(surface.scene(), Scene::Scene1);
        assert!(surface.leds().sink().sent.is_empty());
    }

    #[test]
    fn test_cc_is_dispatched() {
        let mut surface = surface();
        let mut host = ConsoleHost::new("test");

        let event = surface.on_midi(&[0xB0, 80, 127], &mut host);

        assert_eq!(
            event,
            Some(ControlEvent::UtilityButton {
                button: UtilityButton::Play,
                state: ButtonState::Pressed,
            })
        );
        assert_eq!(host.history(), &[HostCommand::Transport(TransportCommand::Play)]);
    }

    #[test]
    fn test_other_statuses_are_ignored() {
        let mut surface = surface();
        let mut host = ConsoleHost::new("test");

        assert_eq!(surface.on_midi(&[0xB1, 80, 127], &mut host), None);
        assert_eq!(surface.on_midi(&[0x90, 80, 127], &mut host), None);
        assert_eq!(surface.on_midi(&[0xB0, 80], &mut host), None);
        assert_eq!(surface.on_midi(&[], &mut host), None);
        assert!(host.history().is_empty());
    }

    #[test]
    fn test_set_toggles_mode_and_led() {
        let mut surface = surface();
        let mut host = ConsoleHost::new("test");

        surface.on_midi(&[0xB0, 55, 127], &mut host);
        assert_eq!(surface.mode(), Mode::Device);
        assert!(surface.leds().utility_led(UtilityButton::Set));
        assert_eq!(surface.leds().sink().bytes(), vec![vec![0xB0, 55, 127]]);

        surface.on_midi(&[0xB0, 55, 0], &mut host);
        surface.on_midi(&[0xB0, 55, 127], &mut host);
        assert_eq!(surface.mode(), Mode::Mixer);
        assert!(!surface.leds().utility_led(UtilityButton::Set));
    }

    #[test]
    fn test_sysex_selects_scene() {
        let mut surface = surface();
        let mut host = ConsoleHost::new("test");

        let sysex = [0xF0, 0x42, 0x40, 0x00, 0x01, 0x37, 0x02, 0x00, 0x00, 0x4F, 0x03, 0xF7];
        assert_eq!(surface.on_midi(&sysex, &mut host), None);
        assert_eq!(surface.scene(), Scene::Scene4);

        assert!(surface.on_sysex("F0 42 40 00 01 37 02 00 00 4F 01 F7"));
        assert_eq!(surface.scene(), Scene::Scene2);
        assert!(!surface.on_sysex("f07e7f0601f7"));
        assert_eq!(surface.scene(), Scene::Scene2);
    }

    #[test]
    fn test_host_state_feedback() {
        let mut surface = surface();
        let mut host = ConsoleHost::new("test");

        surface.on_midi(&[0xB0, 54, 127], &mut host);
        for change in host.take_changes() {
            surface.on_host_state(&change);
        }

        assert!(surface.leds().utility_led(UtilityButton::Cycle));
        assert!(surface.leds().utility_led(UtilityButton::Stop));
    }

    #[test]
    fn test_keepalive_bytes() {
        let mut surface = surface();
        surface.send_keepalive().unwrap();
        assert_eq!(surface.leds().sink().bytes(), vec![vec![176, 127, 127]]);
    }

    #[test]
    fn test_flush_after_sync() {
        let mut surface = surface();
        let host = ConsoleHost::default();

        assert_eq!(surface.sync_from_host(&host), 2);
        surface.leds_mut().sink_mut().clear();

        assert_eq!(surface.flush(), 44);
        assert!(surface.leds().sink().bytes().contains(&vec![0xB0, 63, 127]));
        assert!(surface.leds().sink().bytes().contains(&vec![0xB0, 46, 127]));
    }
}
