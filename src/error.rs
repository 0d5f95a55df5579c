//! Error types for surface construction.

use thiserror::Error;

/// Fatal configuration errors detected while building the control map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlMapError {
    #[error("CC {cc} is assigned to both {first} and {second}")]
    DuplicateCc {
        cc: u8,
        first: String,
        second: String,
    },

    #[error("CC {cc} for {control} is outside the 7-bit range")]
    CcOutOfRange { cc: u8, control: String },
}
