//! Host capability interface
//!
//! Everything the gateway needs from the DAW it controls: a command sink for
//! transport, track, device and application actions, and a handful of state
//! queries. Concrete adapters are injected at startup; tests use
//! [`ConsoleHost`], which simulates the state it is asked to change.

use std::fmt;

pub mod console;

pub use console::ConsoleHost;

/// Continuous value with its resolution (value / resolution is the normalized amount)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledValue {
    pub value: u8,
    pub resolution: u16,
}

impl ScaledValue {
    /// Resolution of a 7-bit controller
    pub const MIDI_RESOLUTION: u16 = 128;

    pub fn midi(value: u8) -> Self {
        Self {
            value,
            resolution: Self::MIDI_RESOLUTION,
        }
    }

    pub fn normalized(&self) -> f64 {
        self.value as f64 / self.resolution as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportCommand {
    Play,
    Stop,
    Record,
    Rewind,
    FastForward,
    TapTempo,
    JumpToPreviousCueMarker,
    JumpToNextCueMarker,
    /// Tempo in BPM
    SetTempo(f64),
    /// Play-start position in beats
    SetPlayStartPosition(f64),
    JumpToPlayStartPosition,
    ResetAutomationOverrides,
    ToggleArrangerLoop,
    ToggleMetronome,
    TogglePreRollMetronome,
}

/// Actions on one track of the 8-track bank
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackCommand {
    ToggleSolo { exclusive: bool },
    ToggleMute,
    ToggleArm,
    /// Select the track in the mixer
    Select,
    SetVolume(ScaledValue),
    SetPan(ScaledValue),
}

/// Actions on the cursor (currently selected) track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorTrackCommand {
    SelectPrevious,
    SelectNext,
    Duplicate,
    ToggleArm,
}

/// Actions on the cursor track's primary device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    SetMacro { index: usize, value: ScaledValue },
    SetParameter { index: usize, value: ScaledValue },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrangerCommand {
    TogglePlaybackFollow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelLayout {
    #[default]
    Arrange,
    Mix,
}

impl PanelLayout {
    pub fn toggled(&self) -> Self {
        match self {
            PanelLayout::Arrange => PanelLayout::Mix,
            PanelLayout::Mix => PanelLayout::Arrange,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PanelLayout::Arrange => "ARRANGE",
            PanelLayout::Mix => "MIX",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationCommand {
    ActivateEngine,
    SetPanelLayout(PanelLayout),
}

/// Any side effect the gateway asks of its host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostCommand {
    Transport(TransportCommand),
    Track { index: usize, command: TrackCommand },
    CursorTrack(CursorTrackCommand),
    Device(DeviceCommand),
    Arranger(ArrangerCommand),
    Application(ApplicationCommand),
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::Transport(cmd) => write!(f, "transport.{:?}", cmd),
            HostCommand::Track { index, command } => write!(f, "track[{}].{:?}", index, command),
            HostCommand::CursorTrack(cmd) => write!(f, "cursor_track.{:?}", cmd),
            HostCommand::Device(cmd) => write!(f, "device.{:?}", cmd),
            HostCommand::Arranger(cmd) => write!(f, "arranger.{:?}", cmd),
            HostCommand::Application(cmd) => write!(f, "application.{:?}", cmd),
        }
    }
}

/// Transport values the jog wheel reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSnapshot {
    /// BPM
    pub tempo: f64,
    /// Beats
    pub play_start: f64,
    pub playing: bool,
}

impl Default for TransportSnapshot {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            play_start: 0.0,
            playing: false,
        }
    }
}

/// Transport flags mirrored on the utility LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportStatus {
    pub playing: bool,
    pub arranger_record: bool,
    pub arranger_loop: bool,
    pub playback_follow: bool,
    pub metronome: bool,
    pub pre_roll_metronome: bool,
}

/// Track flags mirrored on the strip LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackState {
    pub solo: bool,
    pub mute: bool,
    pub arm: bool,
    pub selected: bool,
}

/// Value-change notification from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStateChange {
    Transport(TransportStatus),
    Track { index: usize, state: TrackState },
}

/// Capabilities the gateway consumes from the DAW
///
/// Calls happen on the gateway's single event-loop thread, one at a time.
pub trait Host {
    /// Perform an action
    fn execute(&mut self, command: HostCommand);

    fn transport_snapshot(&self) -> TransportSnapshot;

    fn transport_status(&self) -> TransportStatus;

    /// State of a track in the bank; out-of-range indices read as default
    fn track_state(&self, index: usize) -> TrackState;

    /// Whether the audio engine is running
    fn engine_active(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_value() {
        let value = ScaledValue::midi(64);
        assert_eq!(value.resolution, 128);
        assert_eq!(value.normalized(), 0.5);
    }

    #[test]
    fn test_panel_layout_toggle() {
        assert_eq!(PanelLayout::default(), PanelLayout::Arrange);
        assert_eq!(PanelLayout::Arrange.toggled(), PanelLayout::Mix);
        assert_eq!(PanelLayout::Mix.toggled().name(), "ARRANGE");
    }

    #[test]
    fn test_command_display() {
        let cmd = HostCommand::Track {
            index: 2,
            command: TrackCommand::ToggleMute,
        };
        assert_eq!(cmd.to_string(), "track[2].ToggleMute");
    }
}
