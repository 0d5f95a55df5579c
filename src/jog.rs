//! Jog wheel handling
//!
//! Turns relative jog deltas into transport intents. With the modifier held
//! the wheel nudges the tempo; otherwise it scrubs the play-start position.

use crate::control_map::JogDirection;
use crate::host::{TransportCommand, TransportSnapshot};

pub const MIN_TEMPO: f64 = 10.0;
pub const MAX_TEMPO: f64 = 400.0;
/// BPM per jog tick
pub const TEMPO_STEP: f64 = 0.5;
/// Smallest tempo change worth sending
pub const TEMPO_HYSTERESIS: f64 = 0.1;
/// Beats per jog tick are magnitude / POSITION_DIVISOR
pub const POSITION_DIVISOR: f64 = 16.0;

/// Compute the transport commands for one jog movement
///
/// Returns an empty list when nothing should change.
pub fn handle_jog(
    direction: JogDirection,
    magnitude: f64,
    modifier_active: bool,
    snapshot: &TransportSnapshot,
) -> Vec<TransportCommand> {
    if modifier_active {
        change_tempo(direction.sign() * TEMPO_STEP * magnitude, snapshot)
            .into_iter()
            .collect()
    } else {
        change_play_position(direction, magnitude, snapshot)
    }
}

fn change_tempo(delta: f64, snapshot: &TransportSnapshot) -> Option<TransportCommand> {
    let current = snapshot.tempo;
    let tempo = (current + delta).clamp(MIN_TEMPO, MAX_TEMPO);

    if (tempo - current).abs() >= TEMPO_HYSTERESIS {
        Some(TransportCommand::SetTempo(tempo))
    } else {
        None
    }
}

fn change_play_position(
    direction: JogDirection,
    magnitude: f64,
    snapshot: &TransportSnapshot,
) -> Vec<TransportCommand> {
    // A zero resolution cannot be quantized against
    if !magnitude.is_finite() || magnitude <= 0.0 {
        return Vec::new();
    }

    let resolution = magnitude / POSITION_DIVISOR;
    let current = snapshot.play_start;
    let candidate = (current + direction.sign() * resolution).max(0.0);
    let quantized = (candidate / resolution).floor() * resolution;

    if quantized == current {
        return Vec::new();
    }

    let mut commands = vec![TransportCommand::SetPlayStartPosition(quantized)];
    if snapshot.playing {
        commands.push(TransportCommand::JumpToPlayStartPosition);
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(tempo: f64, play_start: f64, playing: bool) -> TransportSnapshot {
        TransportSnapshot {
            tempo,
            play_start,
            playing,
        }
    }

    #[test]
    fn test_tempo_nudge() {
        let commands = handle_jog(JogDirection::Increment, 2.0, true, &snapshot(120.0, 0.0, false));
        assert_eq!(commands, vec![TransportCommand::SetTempo(121.0)]);

        let commands = handle_jog(JogDirection::Decrement, 4.0, true, &snapshot(120.0, 0.0, false));
        assert_eq!(commands, vec![TransportCommand::SetTempo(118.0)]);
    }

    #[test]
    fn test_tempo_below_hysteresis_is_dropped() {
        let commands = handle_jog(JogDirection::Increment, 0.1, true, &snapshot(120.0, 0.0, false));
        assert!(commands.is_empty());
    }

    #[test]
    fn test_tempo_is_clamped() {
        let commands = handle_jog(JogDirection::Increment, 10.0, true, &snapshot(398.0, 0.0, false));
        assert_eq!(commands, vec![TransportCommand::SetTempo(400.0)]);

        // Already at the floor: clamping leaves nothing to send
        let commands = handle_jog(JogDirection::Decrement, 10.0, true, &snapshot(10.0, 0.0, false));
        assert!(commands.is_empty());
    }

    #[test]
    fn test_position_scrub_stopped() {
        let commands = handle_jog(JogDirection::Increment, 1.0, false, &snapshot(120.0, 0.0, false));
        assert_eq!(commands, vec![TransportCommand::SetPlayStartPosition(0.0625)]);
    }

    #[test]
    fn test_position_scrub_playing_jumps() {
        let commands = handle_jog(JogDirection::Increment, 1.0, false, &snapshot(120.0, 0.0, true));
        assert_eq!(
            commands,
            vec![
                TransportCommand::SetPlayStartPosition(0.0625),
                TransportCommand::JumpToPlayStartPosition,
            ]
        );
    }

    #[test]
    fn test_position_is_quantized_down() {
        // 1.1 + 0.25 = 1.35, floored to a multiple of 0.25
        let commands = handle_jog(JogDirection::Increment, 4.0, false, &snapshot(120.0, 1.1, false));
        assert_eq!(commands, vec![TransportCommand::SetPlayStartPosition(1.25)]);
    }

    #[test]
    fn test_position_clamped_at_zero() {
        let commands = handle_jog(JogDirection::Decrement, 1.0, false, &snapshot(120.0, 0.0, true));
        assert!(commands.is_empty());

        let commands = handle_jog(JogDirection::Decrement, 8.0, false, &snapshot(120.0, 0.25, false));
        assert_eq!(commands, vec![TransportCommand::SetPlayStartPosition(0.0)]);
    }

    #[test]
    fn test_zero_magnitude_is_ignored() {
        assert!(handle_jog(JogDirection::Increment, 0.0, false, &snapshot(120.0, 2.0, true)).is_empty());
        assert!(handle_jog(JogDirection::Increment, 0.0, true, &snapshot(120.0, 2.0, true)).is_empty());
    }
}
