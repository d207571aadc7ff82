//! OAuth device-code authorization.

pub mod client;
pub mod device_code;
pub mod error;

pub use client::DeviceAuthClient;
pub use device_code::{DeviceCodePoll, DeviceCodeSession};
pub use error::AuthError;
