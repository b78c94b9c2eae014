use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

/// Services a key can be scoped to.
///
/// The portal refers to these by opaque codes rather than names,
/// so we carry the code alongside each variant and only ever send that.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceId {
    /// Apple Push Notification service.
    #[serde(rename = "U27F4V844T")]
    Apns,
    #[serde(rename = "DQ8HTZ7739")]
    DeviceCheck,
    #[serde(rename = "6A7HVUVQ3M")]
    MusicKit,
}

impl ServiceId {
    pub const ALL: [ServiceId; 3] = [ServiceId::Apns, ServiceId::DeviceCheck, ServiceId::MusicKit];

    /// The identifier the portal uses for this service.
    pub const fn code(self) -> &'static str {
        match self {
            ServiceId::Apns => "U27F4V844T",
            ServiceId::DeviceCheck => "DQ8HTZ7739",
            ServiceId::MusicKit => "6A7HVUVQ3M",
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceId::Apns => "APNs",
            ServiceId::DeviceCheck => "DeviceCheck",
            ServiceId::MusicKit => "MusicKit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown service identifier: {0}")]
pub struct UnknownServiceId(pub String);

impl FromStr for ServiceId {
    type Err = UnknownServiceId;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        ServiceId::ALL
            .into_iter()
            .find(|service| service.code() == code)
            .ok_or_else(|| UnknownServiceId(code.to_string()))
    }
}

/// Per-service configuration sent when creating a key.
/// Only services present in the map are enabled.
pub type ServiceConfigs = BTreeMap<ServiceId, Vec<serde_json::Value>>;

/// A service entry as returned within a key record.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Service {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Opaque configuration entries, e.g. a MusicKit identifier.
    #[serde(default)]
    pub configurations: Vec<serde_json::Value>,
    /// Anything else the portal sends us.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Service {
    /// The typed identifier, if this is a service we know about.
    pub fn service_id(&self) -> Option<ServiceId> {
        self.id.parse().ok()
    }
}
