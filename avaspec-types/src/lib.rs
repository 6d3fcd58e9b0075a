pub mod consts;
pub mod device_config;
pub mod error;
pub mod fixed_str;
pub mod identity;
pub mod layout;
pub mod meas;
pub mod sensor;
pub mod status;

pub use consts::*;
pub use device_config::*;
pub use error::*;
pub use fixed_str::*;
pub use identity::*;
pub use layout::*;
pub use meas::*;
pub use sensor::*;
pub use status::*;
