// ── Domain model ──
//
// Clean domain types, decoupled from vendor wire formats. Conversion
// from `thermomaven_api::wire` types happens at this boundary via
// `From` impls; telemetry types are re-exported from the push layer
// since they already arrive fully typed.

mod device;

pub use device::{DeviceId, DeviceModel, DeviceRecord};

pub use thermomaven_api::push::{
    CookingState, ProbeStatus, SetParams, StatusData, StatusReport, Temperature,
};
