//! Managing developer portal keys: the tokens used to sign requests
//! to services such as APNs, DeviceCheck and MusicKit.

pub mod api;
pub mod config;
pub mod logging;
pub mod portal;

pub use api::{ApiError, KeyApi, PortalClient};
pub use config::PortalConfig;
pub use portal::{Key, KeyRecord, Service, ServiceId};
