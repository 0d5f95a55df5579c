//! Host state feedback onto the surface LEDs
//!
//! Transport flags light the transport buttons, per-track flags light the
//! strip buttons and the current mode lights SET.

use tracing::trace;

use crate::control_map::{ChannelControl, UtilityButton, CHANNEL_COUNT};
use crate::host::{Host, HostStateChange, TrackState, TransportStatus};
use crate::led::LedCache;
use crate::midi::MidiSink;
use crate::mode::Mode;

/// LED state of each transport button for a given status
pub fn transport_indicators(status: &TransportStatus) -> [(UtilityButton, bool); 7] {
    [
        (UtilityButton::Stop, !status.playing),
        (UtilityButton::Play, status.playing),
        (UtilityButton::Rec, status.arranger_record),
        (UtilityButton::Cycle, status.arranger_loop),
        (UtilityButton::FastForward, status.playback_follow),
        (UtilityButton::PrevMarker, status.pre_roll_metronome),
        (UtilityButton::NextMarker, status.metronome),
    ]
}

/// LED state of each strip button for a given track
pub fn track_indicators(state: &TrackState) -> [(ChannelControl, bool); 4] {
    [
        (ChannelControl::Solo, state.solo),
        (ChannelControl::Mute, state.mute),
        (ChannelControl::Rec, state.arm),
        (ChannelControl::Select, state.selected),
    ]
}

/// Returns the number of LED writes that reached the sink
pub fn apply_transport_status<S: MidiSink>(leds: &mut LedCache<S>, status: &TransportStatus) -> usize {
    transport_indicators(status)
        .into_iter()
        .filter(|&(button, on)| leds.set_utility_led(button, on))
        .count()
}

pub fn apply_track_state<S: MidiSink>(leds: &mut LedCache<S>, index: usize, state: &TrackState) -> usize {
    if index >= CHANNEL_COUNT {
        trace!("Track {} is outside the surface bank", index);
        return 0;
    }
    track_indicators(state)
        .into_iter()
        .filter(|&(control, on)| leds.set_channel_led(index, control, on))
        .count()
}

pub fn apply_change<S: MidiSink>(leds: &mut LedCache<S>, change: &HostStateChange) -> usize {
    match change {
        HostStateChange::Transport(status) => apply_transport_status(leds, status),
        HostStateChange::Track { index, state } => apply_track_state(leds, *index, state),
    }
}

/// SET is lit while the strips drive the device
pub fn apply_mode<S: MidiSink>(leds: &mut LedCache<S>, mode: Mode) -> bool {
    leds.set_utility_led(UtilityButton::Set, mode == Mode::Device)
}

/// Pull every track in the bank and the transport status from the host
pub fn sync_from_host<S: MidiSink>(leds: &mut LedCache<S>, host: &dyn Host) -> usize {
    let mut writes = apply_transport_status(leds, &host.transport_status());
    writes += sync_channel_leds(leds, host);
    writes
}

pub fn sync_channel_leds<S: MidiSink>(leds: &mut LedCache<S>, host: &dyn Host) -> usize {
    (0..CHANNEL_COUNT)
        .map(|index| apply_track_state(leds, index, &host.track_state(index)))
        .sum()
}
