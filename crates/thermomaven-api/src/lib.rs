// thermomaven-api: Async Rust client for the ThermoMaven cloud (signed REST + MQTT push)

pub mod certs;
pub mod client;
pub mod error;
pub mod mqtt;
pub mod push;
pub mod sign;
pub mod transport;
pub mod wire;

pub use client::ApiClient;
pub use error::Error;
pub use mqtt::PushTransport;
pub use push::{PushEnvelope, PushMessage};
