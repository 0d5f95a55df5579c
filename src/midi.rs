//! MIDI utilities and message types
//!
//! Parsing and encoding for the messages the surface exchanges, plus the
//! output abstraction LED and keepalive writes go through.

use anyhow::Result;
use std::fmt;

/// Status byte of a Control Change on channel 1
pub const CONTROL_CHANGE: u8 = 0xB0;
/// Value written for a lit LED
pub const LED_ON: u8 = 127;
/// Value written for a dark LED
pub const LED_OFF: u8 = 0;

/// MIDI messages seen on the surface ports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// System Exclusive, complete frame including the 0xF0/0xF7 delimiters
    SysEx { data: Vec<u8> },

    /// Anything else the surface may send; ignored by the gateway
    Other { status: u8 },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;

        // Running status is not used by the surface
        if status < 0x80 {
            return None;
        }

        match status & 0xF0 {
            0xB0 => {
                if data.len() < 3 {
                    return None;
                }
                Some(MidiMessage::ControlChange {
                    channel: status & 0x0F,
                    cc: data[1] & 0x7F,
                    value: data[2] & 0x7F,
                })
            },
            0xF0 if status == 0xF0 => {
                // Keep everything up to and including the terminator
                let end = data.iter().position(|&b| b == 0xF7)?;
                Some(MidiMessage::SysEx {
                    data: data[..=end].to_vec(),
                })
            },
            _ => Some(MidiMessage::Other { status }),
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![CONTROL_CHANGE | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            },
            MidiMessage::SysEx { ref data } => data.clone(),
            MidiMessage::Other { status } => vec![status],
        }
    }

    /// CC on channel 1, the only channel the surface talks on
    pub fn cc(cc: u8, value: u8) -> Self {
        MidiMessage::ControlChange {
            channel: 0,
            cc,
            value,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            },
            MidiMessage::SysEx { ref data } => write!(f, "SysEx {} bytes", data.len()),
            MidiMessage::Other { status } => write!(f, "Status 0x{:02X}", status),
        }
    }
}

/// Destination for outgoing MIDI (hardware port, or a recorder in tests)
pub trait MidiSink {
    fn send(&mut self, message: &MidiMessage) -> Result<()>;
}

/// Sink that keeps every message, for tests and dry runs
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub sent: Vec<MidiMessage>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes of every message sent so far
    pub fn bytes(&self) -> Vec<Vec<u8>> {
        self.sent.iter().map(MidiMessage::encode).collect()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl MidiSink for RecordingSink {
    fn send(&mut self, message: &MidiMessage) -> Result<()> {
        self.sent.push(message.clone());
        Ok(())
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase contiguous hex, the form scene patterns are keyed by
pub fn sysex_to_hex(data: &[u8]) -> String {
    hex::encode(data)
}
