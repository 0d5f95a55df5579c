//! Control map for the nanoKONTROL Studio surface
//!
//! Declares the fixed CC layout of the hardware and turns incoming
//! (CC, value) pairs into typed control events. The reverse lookup is built
//! once from the forward declarations and refuses to start if two controls
//! share a CC.

use once_cell::sync::Lazy;
use std::fmt;
use tracing::debug;

use crate::error::ControlMapError;

/// Number of channel strips on the surface
pub const CHANNEL_COUNT: usize = 8;

/// Transport and navigation buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UtilityButton {
    Cycle,
    Rewind,
    FastForward,
    Stop,
    Play,
    Rec,
    PrevTrack,
    NextTrack,
    Set,
    PrevMarker,
    NextMarker,
    /// Doubles as the shift modifier
    Back,
}

impl UtilityButton {
    pub const ALL: [UtilityButton; 12] = [
        UtilityButton::Cycle,
        UtilityButton::Rewind,
        UtilityButton::FastForward,
        UtilityButton::Stop,
        UtilityButton::Play,
        UtilityButton::Rec,
        UtilityButton::PrevTrack,
        UtilityButton::NextTrack,
        UtilityButton::Set,
        UtilityButton::PrevMarker,
        UtilityButton::NextMarker,
        UtilityButton::Back,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UtilityButton::Cycle => "cycle",
            UtilityButton::Rewind => "rewind",
            UtilityButton::FastForward => "fast_forward",
            UtilityButton::Stop => "stop",
            UtilityButton::Play => "play",
            UtilityButton::Rec => "rec",
            UtilityButton::PrevTrack => "prev_track",
            UtilityButton::NextTrack => "next_track",
            UtilityButton::Set => "set",
            UtilityButton::PrevMarker => "prev_marker",
            UtilityButton::NextMarker => "next_marker",
            UtilityButton::Back => "back",
        }
    }
}

/// Jog wheel rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JogDirection {
    Decrement,
    Increment,
}

impl JogDirection {
    pub const ALL: [JogDirection; 2] = [JogDirection::Decrement, JogDirection::Increment];

    /// -1.0 for Decrement, +1.0 for Increment
    pub fn sign(&self) -> f64 {
        match self {
            JogDirection::Decrement => -1.0,
            JogDirection::Increment => 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JogDirection::Decrement => "jog_dec",
            JogDirection::Increment => "jog_inc",
        }
    }
}

/// How the raw value of a per-channel control is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Button,
    Continuous,
}

/// Controls repeated on every channel strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelControl {
    Slider,
    Knob,
    Solo,
    Mute,
    Rec,
    Select,
}

impl ChannelControl {
    pub const ALL: [ChannelControl; 6] = [
        ChannelControl::Slider,
        ChannelControl::Knob,
        ChannelControl::Solo,
        ChannelControl::Mute,
        ChannelControl::Rec,
        ChannelControl::Select,
    ];

    pub fn kind(&self) -> ControlKind {
        match self {
            ChannelControl::Slider | ChannelControl::Knob => ControlKind::Continuous,
            _ => ControlKind::Button,
        }
    }

    /// Only the four strip buttons have an LED
    pub fn has_led(&self) -> bool {
        self.kind() == ControlKind::Button
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChannelControl::Slider => "slider",
            ChannelControl::Knob => "knob",
            ChannelControl::Solo => "solo",
            ChannelControl::Mute => "mute",
            ChannelControl::Rec => "rec",
            ChannelControl::Select => "select",
        }
    }
}

/// Button press/release derived from the CC value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

impl ButtonState {
    pub fn from_value(value: u8) -> Self {
        if value > 0 {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }

    pub fn is_pressed(&self) -> bool {
        matches!(self, ButtonState::Pressed)
    }
}

/// A physical control on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlIdentity {
    Utility(UtilityButton),
    Jog(JogDirection),
    Channel {
        channel: usize,
        control: ChannelControl,
    },
}

impl fmt::Display for ControlIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlIdentity::Utility(button) => write!(f, "{}", button.name()),
            ControlIdentity::Jog(direction) => write!(f, "{}", direction.name()),
            ControlIdentity::Channel { channel, control } => {
                write!(f, "{}{}", control.name(), channel + 1)
            },
        }
    }
}

/// Typed event produced for one incoming CC message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    UtilityButton {
        button: UtilityButton,
        state: ButtonState,
    },
    JogMove {
        direction: JogDirection,
        magnitude: u8,
    },
    ChannelButton {
        channel: usize,
        control: ChannelControl,
        state: ButtonState,
    },
    ChannelContinuous {
        channel: usize,
        control: ChannelControl,
        value: u8,
    },
    Unrecognized,
}

/// CC numbers of one channel strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCcs {
    pub slider: u8,
    pub knob: u8,
    pub solo: u8,
    pub mute: u8,
    pub rec: u8,
    pub select: u8,
}

impl ChannelCcs {
    pub fn cc(&self, control: ChannelControl) -> u8 {
        match control {
            ChannelControl::Slider => self.slider,
            ChannelControl::Knob => self.knob,
            ChannelControl::Solo => self.solo,
            ChannelControl::Mute => self.mute,
            ChannelControl::Rec => self.rec,
            ChannelControl::Select => self.select,
        }
    }
}

pub const UTILITY_BUTTON_TO_CC: [(UtilityButton, u8); 12] = [
    (UtilityButton::Cycle, 54),
    (UtilityButton::Rewind, 58),
    (UtilityButton::FastForward, 59),
    (UtilityButton::Stop, 63),
    (UtilityButton::Play, 80),
    (UtilityButton::Rec, 81),
    (UtilityButton::PrevTrack, 60),
    (UtilityButton::NextTrack, 61),
    (UtilityButton::Back, 62),
    (UtilityButton::Set, 55),
    (UtilityButton::PrevMarker, 56),
    (UtilityButton::NextMarker, 57),
];

pub const JOG_TO_CC: [(JogDirection, u8); 2] = [
    (JogDirection::Decrement, 85),
    (JogDirection::Increment, 83),
];

/// Hardware layout of the eight strips. Offsets are irregular (CC 7, 10, 11
/// and 32 are skipped), so this must stay declared rather than computed.
pub const CHANNEL_CONTROLS: [ChannelCcs; CHANNEL_COUNT] = [
    ChannelCcs { slider: 2, knob: 13, solo: 29, mute: 21, rec: 38, select: 46 },
    ChannelCcs { slider: 3, knob: 14, solo: 30, mute: 22, rec: 39, select: 47 },
    ChannelCcs { slider: 4, knob: 15, solo: 31, mute: 23, rec: 40, select: 48 },
    ChannelCcs { slider: 5, knob: 16, solo: 33, mute: 24, rec: 41, select: 49 },
    ChannelCcs { slider: 6, knob: 17, solo: 34, mute: 25, rec: 42, select: 50 },
    ChannelCcs { slider: 8, knob: 18, solo: 35, mute: 26, rec: 43, select: 51 },
    ChannelCcs { slider: 9, knob: 19, solo: 36, mute: 27, rec: 44, select: 52 },
    ChannelCcs { slider: 12, knob: 20, solo: 37, mute: 28, rec: 45, select: 53 },
];

/// CC sent periodically to keep the device awake
pub const KEEPALIVE_CC: u8 = 127;

/// Bidirectional control table
#[derive(Debug, Clone)]
pub struct ControlMap {
    /// Reverse lookup indexed by CC number
    by_cc: [Option<ControlIdentity>; 128],
    utility: Vec<(UtilityButton, u8)>,
    jog: Vec<(JogDirection, u8)>,
    channels: Vec<ChannelCcs>,
}

impl ControlMap {
    /// Build the map from the hardware declarations
    pub fn new() -> Result<Self, ControlMapError> {
        Self::from_declarations(&UTILITY_BUTTON_TO_CC, &JOG_TO_CC, &CHANNEL_CONTROLS)
    }

    /// Build a map from arbitrary forward tables, checking injectivity
    pub fn from_declarations(
        utility: &[(UtilityButton, u8)],
        jog: &[(JogDirection, u8)],
        channels: &[ChannelCcs],
    ) -> Result<Self, ControlMapError> {
        let mut by_cc: [Option<ControlIdentity>; 128] = [None; 128];

        let mut insert = |cc: u8, identity: ControlIdentity| -> Result<(), ControlMapError> {
            let slot = by_cc
                .get_mut(cc as usize)
                .ok_or_else(|| ControlMapError::CcOutOfRange {
                    cc,
                    control: identity.to_string(),
                })?;
            if let Some(existing) = slot.as_ref() {
                return Err(ControlMapError::DuplicateCc {
                    cc,
                    first: existing.to_string(),
                    second: identity.to_string(),
                });
            }
            *slot = Some(identity);
            Ok(())
        };

        for &(button, cc) in utility {
            insert(cc, ControlIdentity::Utility(button))?;
        }
        for &(direction, cc) in jog {
            insert(cc, ControlIdentity::Jog(direction))?;
        }
        for (channel, ccs) in channels.iter().enumerate() {
            for control in ChannelControl::ALL {
                insert(ccs.cc(control), ControlIdentity::Channel { channel, control })?;
            }
        }

        debug!(
            "Control map built: {} utility, {} jog, {} channels",
            utility.len(),
            jog.len(),
            channels.len()
        );

        Ok(Self {
            by_cc,
            utility: utility.to_vec(),
            jog: jog.to_vec(),
            channels: channels.to_vec(),
        })
    }

    /// Identity bound to a CC, if any
    pub fn identity(&self, cc: u8) -> Option<ControlIdentity> {
        self.by_cc.get(cc as usize).copied().flatten()
    }

    /// Parse a CC message into a typed control event
    ///
    /// Total over its inputs: unmapped CCs give `ControlEvent::Unrecognized`.
    /// Button controls are pressed for any non-zero value; continuous controls
    /// pass the raw value through.
    pub fn map_to_control_event(&self, cc: u8, value: u8) -> ControlEvent {
        match self.identity(cc) {
            Some(ControlIdentity::Utility(button)) => ControlEvent::UtilityButton {
                button,
                state: ButtonState::from_value(value),
            },
            Some(ControlIdentity::Jog(direction)) => ControlEvent::JogMove {
                direction,
                magnitude: value,
            },
            Some(ControlIdentity::Channel { channel, control }) => match control.kind() {
                ControlKind::Button => ControlEvent::ChannelButton {
                    channel,
                    control,
                    state: ButtonState::from_value(value),
                },
                ControlKind::Continuous => ControlEvent::ChannelContinuous {
                    channel,
                    control,
                    value,
                },
            },
            None => ControlEvent::Unrecognized,
        }
    }

    pub fn utility_cc(&self, button: UtilityButton) -> Option<u8> {
        self.utility
            .iter()
            .find(|(b, _)| *b == button)
            .map(|(_, cc)| *cc)
    }

    pub fn jog_cc(&self, direction: JogDirection) -> Option<u8> {
        self.jog
            .iter()
            .find(|(d, _)| *d == direction)
            .map(|(_, cc)| *cc)
    }

    /// CC of a strip control; `None` for a channel outside the surface
    pub fn channel_cc(&self, channel: usize, control: ChannelControl) -> Option<u8> {
        self.channels.get(channel).map(|ccs| ccs.cc(control))
    }

    /// Every CC that drives an LED: utility buttons plus the strip buttons
    pub fn led_ccs(&self) -> Vec<u8> {
        let mut ccs: Vec<u8> = self.utility.iter().map(|(_, cc)| *cc).collect();
        for strip in &self.channels {
            ccs.extend(
                ChannelControl::ALL
                    .iter()
                    .filter(|control| control.has_led())
                    .map(|control| strip.cc(*control)),
            );
        }
        ccs
    }

    /// All mapped controls in ascending CC order
    pub fn entries(&self) -> impl Iterator<Item = (u8, ControlIdentity)> + '_ {
        self.by_cc
            .iter()
            .enumerate()
            .filter_map(|(cc, identity)| identity.map(|id| (cc as u8, id)))
    }
}

static DEFAULT_MAP: Lazy<ControlMap> = Lazy::new(|| match ControlMap::new() {
    Ok(map) => map,
    Err(e) => panic!("Invalid nanoKONTROL control map: {}", e),
});

/// The surface's control map, checked on first access
pub fn default_map() -> &'static ControlMap {
    &DEFAULT_MAP
}

/// Parse a CC message with the default map
pub fn map_to_control_event(cc: u8, value: u8) -> ControlEvent {
    default_map().map_to_control_event(cc, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_map_is_injective() {
        let map = ControlMap::new().unwrap();
        // 12 utility + 2 jog + 8 * 6 strip controls
        assert_eq!(map.entries().count(), 62);
    }

    #[test]
    fn test_utility_round_trip() {
        for (button, cc) in UTILITY_BUTTON_TO_CC {
            for value in [0, 1, 64, 127] {
                match map_to_control_event(cc, value) {
                    ControlEvent::UtilityButton { button: b, .. } => assert_eq!(b, button),
                    other => panic!("CC {} parsed as {:?}", cc, other),
                }
            }
        }
    }

    #[test]
    fn test_jog_round_trip() {
        assert_eq!(
            map_to_control_event(83, 3),
            ControlEvent::JogMove {
                direction: JogDirection::Increment,
                magnitude: 3
            }
        );
        assert_eq!(
            map_to_control_event(85, 1),
            ControlEvent::JogMove {
                direction: JogDirection::Decrement,
                magnitude: 1
            }
        );
    }

    #[test]
    fn test_channel_round_trip() {
        for (channel, ccs) in CHANNEL_CONTROLS.iter().enumerate() {
            for control in ChannelControl::ALL {
                let event = map_to_control_event(ccs.cc(control), 100);
                match (control.kind(), event) {
                    (
                        ControlKind::Button,
                        ControlEvent::ChannelButton {
                            channel: ch,
                            control: c,
                            state,
                        },
                    ) => {
                        assert_eq!((ch, c), (channel, control));
                        assert_eq!(state, ButtonState::Pressed);
                    },
                    (
                        ControlKind::Continuous,
                        ControlEvent::ChannelContinuous {
                            channel: ch,
                            control: c,
                            value,
                        },
                    ) => {
                        assert_eq!((ch, c), (channel, control));
                        assert_eq!(value, 100);
                    },
                    (_, other) => panic!("{:?} on channel {} parsed as {:?}", control, channel, other),
                }
            }
        }
    }

    #[test]
    fn test_unmapped_ccs_are_unrecognized() {
        let map = default_map();
        for cc in [0u8, 1, 7, 10, 11, 32, 64, 82, 84, 86, 127] {
            assert!(map.identity(cc).is_none());
            assert_eq!(map_to_control_event(cc, 127), ControlEvent::Unrecognized);
            assert_eq!(map_to_control_event(cc, 0), ControlEvent::Unrecognized);
        }
    }

    #[test]
    fn test_button_value_semantics() {
        let play = 80;
        assert_eq!(
            map_to_control_event(play, 0),
            ControlEvent::UtilityButton {
                button: UtilityButton::Play,
                state: ButtonState::Released
            }
        );
        for value in [1, 64, 127] {
            assert_eq!(
                map_to_control_event(play, value),
                ControlEvent::UtilityButton {
                    button: UtilityButton::Play,
                    state: ButtonState::Pressed
                }
            );
        }
    }

    #[test]
    fn test_duplicate_cc_fails_construction() {
        let utility = [(UtilityButton::Play, 80), (UtilityButton::Stop, 80)];
        let err = ControlMap::from_declarations(&utility, &JOG_TO_CC, &CHANNEL_CONTROLS).unwrap_err();
        assert_eq!(
            err,
            ControlMapError::DuplicateCc {
                cc: 80,
                first: "play".to_string(),
                second: "stop".to_string(),
            }
        );

        // A strip control colliding with a utility button
        let mut channels = CHANNEL_CONTROLS;
        channels[3].select = 54;
        let err = ControlMap::from_declarations(&UTILITY_BUTTON_TO_CC, &JOG_TO_CC, &channels).unwrap_err();
        assert!(matches!(err, ControlMapError::DuplicateCc { cc: 54, .. }));
    }

    #[test]
    fn test_out_of_range_cc_fails_construction() {
        let utility = [(UtilityButton::Play, 200)];
        let err = ControlMap::from_declarations(&utility, &[], &[]).unwrap_err();
        assert!(matches!(err, ControlMapError::CcOutOfRange { cc: 200, .. }));
    }

    #[test]
    fn test_forward_lookups() {
        let map = default_map();
        assert_eq!(map.utility_cc(UtilityButton::Set), Some(55));
        assert_eq!(map.jog_cc(JogDirection::Increment), Some(83));
        assert_eq!(map.channel_cc(5, ChannelControl::Slider), Some(8));
        assert_eq!(map.channel_cc(8, ChannelControl::Solo), None);
    }

    #[test]
    fn test_led_ccs_cover_buttons_only() {
        let ccs = default_map().led_ccs();
        assert_eq!(ccs.len(), 12 + 4 * CHANNEL_COUNT);
        assert!(ccs.contains(&29)); // solo1
        assert!(ccs.contains(&53)); // select8
        assert!(!ccs.contains(&2)); // slider1
        assert!(!ccs.contains(&83)); // jog
    }

    proptest! {
        #[test]
        fn prop_parse_is_total_and_consistent(cc in 0u8..128, value in 0u8..128) {
            let map = default_map();
            let event = map.map_to_control_event(cc, value);
            match map.identity(cc) {
                None => prop_assert_eq!(event, ControlEvent::Unrecognized),
                Some(ControlIdentity::Utility(button)) => prop_assert_eq!(
                    event,
                    ControlEvent::UtilityButton { button, state: ButtonState::from_value(value) }
                ),
                Some(ControlIdentity::Jog(direction)) => prop_assert_eq!(
                    event,
                    ControlEvent::JogMove { direction, magnitude: value }
                ),
                Some(ControlIdentity::Channel { channel, control }) => {
                    prop_assert!(channel < CHANNEL_COUNT);
                    prop_assert_eq!(map.channel_cc(channel, control), Some(cc));
                },
            }
        }
    }
}
