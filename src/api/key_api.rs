use async_trait::async_trait;
use std::fmt::Debug;

use super::ApiError;
use crate::portal::{KeyRecord, ServiceConfigs};

/// The portal operations a `Key` relies upon.
///
/// `PortalClient` speaks HTTP; tests swap in an in-memory implementation.
#[async_trait]
pub trait KeyApi: Send + Sync + Debug {
    /// Every key visible to the current team.
    async fn list_keys(&self) -> Result<Vec<KeyRecord>, ApiError>;

    async fn get_key(&self, id: &str) -> Result<KeyRecord, ApiError>;

    async fn create_key(
        &self,
        name: &str,
        service_configs: &ServiceConfigs,
    ) -> Result<KeyRecord, ApiError>;

    async fn revoke_key(&self, id: &str) -> Result<(), ApiError>;

    /// The private key material, as PEM-encoded text.
    async fn download_key(&self, id: &str) -> Result<String, ApiError>;
}
