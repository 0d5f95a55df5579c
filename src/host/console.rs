//! Console host - logs every command and simulates the DAW state it touches
//!
//! Useful for:
//! - Exercising the surface without a DAW attached
//! - Checking chord and mode behaviour from the logs
//! - Standing in for the real host in tests

use tracing::{debug, info};

use super::{
    ApplicationCommand, ArrangerCommand, CursorTrackCommand, DeviceCommand, Host, HostCommand,
    HostStateChange, PanelLayout, ScaledValue, TrackCommand, TrackState, TransportCommand,
    TransportSnapshot, TransportStatus,
};
use crate::control_map::CHANNEL_COUNT;

/// Simulated per-track mixer values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackLevels {
    pub volume: Option<ScaledValue>,
    pub pan: Option<ScaledValue>,
}

/// In-memory host that records what it was asked to do
#[derive(Debug)]
pub struct ConsoleHost {
    name: String,
    snapshot: TransportSnapshot,
    status: TransportStatus,
    tracks: [TrackState; CHANNEL_COUNT],
    levels: [TrackLevels; CHANNEL_COUNT],
    macros: [Option<ScaledValue>; CHANNEL_COUNT],
    parameters: [Option<ScaledValue>; CHANNEL_COUNT],
    cursor: usize,
    engine_active: bool,
    panel_layout: PanelLayout,
    history: Vec<HostCommand>,
    changes: Vec<HostStateChange>,
}

impl ConsoleHost {
    pub fn new(name: impl Into<String>) -> Self {
        let mut tracks = [TrackState::default(); CHANNEL_COUNT];
        tracks[0].selected = true;
        Self {
            name: name.into(),
            snapshot: TransportSnapshot::default(),
            status: TransportStatus::default(),
            tracks,
            levels: [TrackLevels::default(); CHANNEL_COUNT],
            macros: [None; CHANNEL_COUNT],
            parameters: [None; CHANNEL_COUNT],
            cursor: 0,
            engine_active: true,
            panel_layout: PanelLayout::default(),
            history: Vec::new(),
            changes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start with the audio engine stopped
    pub fn with_engine_inactive(mut self) -> Self {
        self.engine_active = false;
        self
    }

    /// Overwrite tempo, play-start and playing state
    pub fn with_transport(mut self, snapshot: TransportSnapshot) -> Self {
        self.snapshot = snapshot;
        self.status.playing = snapshot.playing;
        self
    }

    /// Every command executed so far, oldest first
    pub fn history(&self) -> &[HostCommand] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// State changes produced since the last call, for LED feedback
    pub fn take_changes(&mut self) -> Vec<HostStateChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn panel_layout(&self) -> PanelLayout {
        self.panel_layout
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn levels(&self, index: usize) -> Option<TrackLevels> {
        self.levels.get(index).copied()
    }

    pub fn macro_value(&self, index: usize) -> Option<ScaledValue> {
        self.macros.get(index).copied().flatten()
    }

    pub fn parameter_value(&self, index: usize) -> Option<ScaledValue> {
        self.parameters.get(index).copied().flatten()
    }

    fn transport_changed(&mut self) {
        self.status.playing = self.snapshot.playing;
        self.changes.push(HostStateChange::Transport(self.status));
    }

    fn track_changed(&mut self, index: usize) {
        self.changes.push(HostStateChange::Track {
            index,
            state: self.tracks[index],
        });
    }

    fn select_track(&mut self, index: usize) {
        if index >= CHANNEL_COUNT {
            return;
        }
        let previous = self.cursor;
        self.cursor = index;
        self.tracks[previous].selected = false;
        self.tracks[index].selected = true;
        if previous != index {
            self.track_changed(previous);
        }
        self.track_changed(index);
    }

    fn apply_transport(&mut self, command: TransportCommand) {
        match command {
            TransportCommand::Play => {
                self.snapshot.playing = true;
                self.transport_changed();
            },
            TransportCommand::Stop => {
                self.snapshot.playing = false;
                self.transport_changed();
            },
            TransportCommand::Record => {
                self.status.arranger_record = !self.status.arranger_record;
                self.transport_changed();
            },
            TransportCommand::Rewind => {
                self.snapshot.play_start = (self.snapshot.play_start - 1.0).max(0.0);
            },
            TransportCommand::FastForward => {
                self.snapshot.play_start += 1.0;
            },
            TransportCommand::SetTempo(bpm) => self.snapshot.tempo = bpm,
            TransportCommand::SetPlayStartPosition(beats) => self.snapshot.play_start = beats,
            TransportCommand::ToggleArrangerLoop => {
                self.status.arranger_loop = !self.status.arranger_loop;
                self.transport_changed();
            },
            TransportCommand::ToggleMetronome => {
                self.status.metronome = !self.status.metronome;
                self.transport_changed();
            },
            TransportCommand::TogglePreRollMetronome => {
                self.status.pre_roll_metronome = !self.status.pre_roll_metronome;
                self.transport_changed();
            },
            TransportCommand::TapTempo
            | TransportCommand::JumpToPreviousCueMarker
            | TransportCommand::JumpToNextCueMarker
            | TransportCommand::JumpToPlayStartPosition
            | TransportCommand::ResetAutomationOverrides => {},
        }
    }

    fn apply_track(&mut self, index: usize, command: TrackCommand) {
        if index >= CHANNEL_COUNT {
            debug!("ConsoleHost '{}': no track at index {}", self.name, index);
            return;
        }
        match command {
            TrackCommand::ToggleSolo { exclusive } => {
                let solo = !self.tracks[index].solo;
                if solo && exclusive {
                    for other in (0..CHANNEL_COUNT).filter(|&i| i != index) {
                        if self.tracks[other].solo {
                            self.tracks[other].solo = false;
                            self.track_changed(other);
                        }
                    }
                }
                self.tracks[index].solo = solo;
                self.track_changed(index);
            },
            TrackCommand::ToggleMute => {
                self.tracks[index].mute = !self.tracks[index].mute;
                self.track_changed(index);
            },
            TrackCommand::ToggleArm => {
                self.tracks[index].arm = !self.tracks[index].arm;
                self.track_changed(index);
            },
            TrackCommand::Select => self.select_track(index),
            TrackCommand::SetVolume(value) => self.levels[index].volume = Some(value),
            TrackCommand::SetPan(value) => self.levels[index].pan = Some(value),
        }
    }

    fn apply_cursor_track(&mut self, command: CursorTrackCommand) {
        match command {
            CursorTrackCommand::SelectPrevious => {
                if let Some(index) = self.cursor.checked_sub(1) {
                    self.select_track(index);
                }
            },
            CursorTrackCommand::SelectNext => self.select_track(self.cursor + 1),
            CursorTrackCommand::ToggleArm => self.apply_track(self.cursor, TrackCommand::ToggleArm),
            CursorTrackCommand::Duplicate => {},
        }
    }
}

impl Default for ConsoleHost {
    fn default() -> Self {
        Self::new("console")
    }
}

impl Host for ConsoleHost {
    fn execute(&mut self, command: HostCommand) {
        self.history.push(command);

        info!(
            "🎛️  [{}] Host '{}' → {} [exec #{}]",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.name,
            command,
            self.history.len()
        );

        match command {
            HostCommand::Transport(cmd) => self.apply_transport(cmd),
            HostCommand::Track { index, command } => self.apply_track(index, command),
            HostCommand::CursorTrack(cmd) => self.apply_cursor_track(cmd),
            HostCommand::Device(DeviceCommand::SetMacro { index, value }) => {
                if let Some(slot) = self.macros.get_mut(index) {
                    *slot = Some(value);
                }
            },
            HostCommand::Device(DeviceCommand::SetParameter { index, value }) => {
                if let Some(slot) = self.parameters.get_mut(index) {
                    *slot = Some(value);
                }
            },
            HostCommand::Arranger(ArrangerCommand::TogglePlaybackFollow) => {
                self.status.playback_follow = !self.status.playback_follow;
                self.transport_changed();
            },
            HostCommand::Application(ApplicationCommand::ActivateEngine) => {
                self.engine_active = true;
            },
            HostCommand::Application(ApplicationCommand::SetPanelLayout(layout)) => {
                self.panel_layout = layout;
            },
        }

        debug!(
            host = %self.name,
            command = ?command,
            pending_changes = self.changes.len(),
            "ConsoleHost execution"
        );
    }

    fn transport_snapshot(&self) -> TransportSnapshot {
        self.snapshot
    }

    fn transport_status(&self) -> TransportStatus {
        self.status
    }

    fn track_state(&self, index: usize) -> TrackState {
        self.tracks.get(index).copied().unwrap_or_default()
    }

    fn engine_active(&self) -> bool {
        self.engine_active
    }
}
