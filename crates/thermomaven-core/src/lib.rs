// thermomaven-core: device roster reconciliation and command dispatch
// on top of thermomaven-api.

pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod store;

pub use config::AccountConfig;
pub use coordinator::{Coordinator, ConnectionState, DeviceSnapshot};
pub use dispatch::{CookingAction, ProbeCommand};
pub use error::CoreError;
pub use model::{DeviceId, DeviceModel, DeviceRecord};
pub use reconcile::{ReconcileEngine, SyncState};
