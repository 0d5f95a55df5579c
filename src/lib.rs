//! nanoKONTROL GW - Korg nanoKONTROL Studio gateway
//!
//! Translates the surface's Control Change stream into transport, mixer and
//! device commands for a DAW host, and mirrors host state back onto the
//! surface LEDs.

pub mod config;
pub mod control_map;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod jog;
pub mod led;
pub mod midi;
pub mod mode;
pub mod scene;
pub mod status;
pub mod surface;

pub use control_map::{map_to_control_event, ControlEvent, ControlMap};
pub use dispatcher::EventDispatcher;
pub use host::{ConsoleHost, Host, HostCommand};
pub use surface::Surface;
