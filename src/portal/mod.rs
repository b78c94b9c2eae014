mod key;
mod service;

pub use key::{Key, KeyRecord};
pub use service::{Service, ServiceConfigs, ServiceId, UnknownServiceId};
