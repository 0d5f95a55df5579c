//! LED output cache
//!
//! Remembers the last state written to every LED so that repeated requests
//! stay off the wire, and can replay the whole set for resynchronization
//! after a power cycle or a dropped message.

use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

use crate::control_map::{default_map, ChannelControl, ControlMap, UtilityButton};
use crate::midi::{MidiMessage, MidiSink, LED_OFF, LED_ON};

pub struct LedCache<S: MidiSink> {
    /// Keyed by CC, fixed at construction
    state: BTreeMap<u8, bool>,
    map: &'static ControlMap,
    sink: S,
}

impl<S: MidiSink> LedCache<S> {
    /// Track every LED of the surface, all off
    pub fn new(sink: S) -> Self {
        Self::with_map(default_map(), sink)
    }

    pub fn with_map(map: &'static ControlMap, sink: S) -> Self {
        let state = map.led_ccs().into_iter().map(|cc| (cc, false)).collect();
        Self { state, map, sink }
    }

    /// Request an LED state; returns true when a MIDI message was sent
    ///
    /// CCs without an LED are ignored.
    pub fn set_led(&mut self, cc: u8, on: bool) -> bool {
        let Some(cached) = self.state.get_mut(&cc) else {
            trace!("No LED on CC {}", cc);
            return false;
        };

        let changed = *cached != on;
        *cached = on;

        if changed {
            write_led(&mut self.sink, cc, on);
        }
        changed
    }

    /// Last written state of an LED CC
    pub fn led(&self, cc: u8) -> Option<bool> {
        self.state.get(&cc).copied()
    }

    pub fn set_utility_led(&mut self, button: UtilityButton, on: bool) -> bool {
        match self.map.utility_cc(button) {
            Some(cc) => self.set_led(cc, on),
            None => false,
        }
    }

    /// Out-of-range channels and LED-less controls are ignored
    pub fn set_channel_led(&mut self, channel: usize, control: ChannelControl, on: bool) -> bool {
        match self.channel_led_cc(channel, control) {
            Some(cc) => self.set_led(cc, on),
            None => false,
        }
    }

    pub fn utility_led(&self, button: UtilityButton) -> bool {
        self.map
            .utility_cc(button)
            .and_then(|cc| self.led(cc))
            .unwrap_or(false)
    }

    pub fn channel_led(&self, channel: usize, control: ChannelControl) -> bool {
        self.channel_led_cc(channel, control)
            .and_then(|cc| self.led(cc))
            .unwrap_or(false)
    }

    /// Re-send every LED regardless of what was written before
    pub fn flush(&mut self) -> usize {
        for (&cc, &on) in &self.state {
            write_led(&mut self.sink, cc, on);
        }
        debug!("Flushed {} LEDs", self.state.len());
        self.state.len()
    }

    /// Number of tracked LEDs
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn channel_led_cc(&self, channel: usize, control: ChannelControl) -> Option<u8> {
        if !control.has_led() {
            return None;
        }
        self.map.channel_cc(channel, control)
    }
}

/// LED feedback is best effort: failures are logged, not propagated
fn write_led<S: MidiSink>(sink: &mut S, cc: u8, on: bool) {
    let value = if on { LED_ON } else { LED_OFF };
    if let Err(e) = sink.send(&MidiMessage::cc(cc, value)) {
        warn!("Failed to write LED CC {}: {}", cc, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::RecordingSink;

    fn cache() -> LedCache<RecordingSink> {
        LedCache::new(RecordingSink::new())
    }

    #[test]
    fn test_tracks_utility_and_strip_buttons() {
        let leds = cache();
        assert_eq!(leds.len(), 44);
        assert_eq!(leds.led(80), Some(false));
        assert_eq!(leds.led(2), None); // slider has no LED
    }

    #[test]
    fn test_repeated_writes_are_suppressed() {
        let mut leds = cache();
        assert!(leds.set_led(80, true));
        assert!(!leds.set_led(80, true));
        assert_eq!(leds.sink().bytes(), vec![vec![0xB0, 80, 127]]);

        assert!(leds.set_led(80, false));
        assert_eq!(leds.sink().bytes().last(), Some(&vec![0xB0, 80, 0]));
    }

    #[test]
    fn test_initial_off_request_is_not_sent() {
        let mut leds = cache();
        assert!(!leds.set_led(63, false));
        assert!(leds.sink().sent.is_empty());
    }

    #[test]
    fn test_untracked_cc_is_ignored() {
        let mut leds = cache();
        assert!(!leds.set_led(2, true));
        assert!(!leds.set_led(120, true));
        assert_eq!(leds.led(120), None);
        assert_eq!(leds.len(), 44);
        assert!(leds.sink().sent.is_empty());
    }

    #[test]
    fn test_flush_resends_everything() {
        let mut leds = cache();
        leds.set_led(54, true);
        leds.sink_mut().clear();

        assert_eq!(leds.flush(), 44);
        assert_eq!(leds.sink().sent.len(), 44);
        assert!(leds.sink().bytes().contains(&vec![0xB0, 54, 127]));
        assert!(leds.sink().bytes().contains(&vec![0xB0, 29, 0]));

        // A second flush sends the same set again
        leds.flush();
        assert_eq!(leds.sink().sent.len(), 88);
    }

    #[test]
    fn test_named_accessors() {
        let mut leds = cache();
        assert!(leds.set_utility_led(UtilityButton::Set, true));
        assert!(leds.utility_led(UtilityButton::Set));
        assert_eq!(leds.led(55), Some(true));

        assert!(leds.set_channel_led(3, ChannelControl::Solo, true));
        assert!(leds.channel_led(3, ChannelControl::Solo));
        assert_eq!(leds.led(33), Some(true));
    }

    #[test]
    fn test_invalid_channel_requests_are_noops() {
        let mut leds = cache();
        assert!(!leds.set_channel_led(8, ChannelControl::Mute, true));
        assert!(!leds.set_channel_led(0, ChannelControl::Slider, true));
        assert!(!leds.set_channel_led(0, ChannelControl::Knob, true));
        assert!(!leds.channel_led(42, ChannelControl::Mute));
        assert!(!leds.channel_led(0, ChannelControl::Slider));
        assert!(leds.sink().sent.is_empty());
    }
}
