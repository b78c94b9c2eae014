use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, sync::Arc};

use super::{Service, ServiceConfigs, ServiceId};
use crate::api::{ApiError, KeyApi};

/// A key as the portal describes it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct KeyRecord {
    #[serde(rename = "keyId")]
    pub id: String,
    #[serde(rename = "keyName", default)]
    pub name: String,
    /// Absent unless the portal chose to include it.
    /// Listings typically omit it, while fetching a single key does not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<Service>>,
    #[serde(rename = "canDownload", default)]
    pub can_download: bool,
    #[serde(rename = "canRevoke", default)]
    pub can_revoke: bool,
    /// Remaining fields we don't model, kept so a reload replaces them too.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A key (or "JWT token") used for signing requests to services such as APNs.
///
/// This is a snapshot of the portal's state as of the last fetch.
/// Nothing refreshes it other than `reload`.
pub struct Key {
    client: Arc<dyn KeyApi>,
    record: KeyRecord,
}

impl Key {
    /// Wraps an existing record.
    pub fn new(client: Arc<dyn KeyApi>, record: KeyRecord) -> Self {
        Self { client, record }
    }

    /// Every key available to the team.
    pub async fn list_all(client: Arc<dyn KeyApi>) -> Result<Vec<Key>, ApiError> {
        let records = client.list_keys().await?;
        Ok(records
            .into_iter()
            .map(|record| Key::new(Arc::clone(&client), record))
            .collect())
    }

    pub async fn find(client: Arc<dyn KeyApi>, id: &str) -> Result<Key, ApiError> {
        let record = fetch(client.as_ref(), id).await?;
        Ok(Key::new(client, record))
    }

    /// Creates a new key with the given services enabled.
    ///
    /// `music_kit_id` is the portal's generated MusicKit identifier,
    /// not the reverse-DNS name you chose (e.g. `music.com.example`).
    pub async fn create(
        client: Arc<dyn KeyApi>,
        name: &str,
        enable_apns: bool,
        enable_device_check: bool,
        music_kit_id: Option<&str>,
    ) -> Result<Key, ApiError> {
        let service_configs = service_configs(enable_apns, enable_device_check, music_kit_id);
        let record = client.create_key(name, &service_configs).await?;
        Ok(Key::new(client, record))
    }

    /// Revokes this key on the portal.
    ///
    /// Our local copy is left as-is. Whether a key can be revoked is
    /// up to the portal; `can_revoke` is not consulted beforehand.
    pub async fn revoke(&self) -> Result<(), ApiError> {
        self.client.revoke_key(&self.record.id).await
    }

    /// Downloads this key's private key material.
    pub async fn download(&self) -> Result<String, ApiError> {
        self.client.download_key(&self.record.id).await
    }

    /// The services this key is enabled for.
    ///
    /// If they were not part of the record we were created with, this reloads
    /// the key (replacing every field, not only services) and caches the result.
    /// Should the reloaded record still have no services, an empty list is cached.
    pub async fn services(&mut self) -> Result<&[Service], ApiError> {
        if self.record.services.is_none() {
            self.reload().await?;
        }

        let services = self.record.services.get_or_insert_with(Vec::new);
        Ok(services.as_slice())
    }

    /// The configuration entries for the given service, if this key has it enabled.
    pub async fn service_configurations_for(
        &mut self,
        service_id: &str,
    ) -> Result<Option<&[Value]>, ApiError> {
        let services = self.services().await?;
        Ok(services
            .iter()
            .find(|service| service.id == service_id)
            .map(|service| service.configurations.as_slice()))
    }

    pub async fn has_service(&mut self, service: ServiceId) -> Result<bool, ApiError> {
        Ok(self
            .service_configurations_for(service.code())
            .await?
            .is_some())
    }

    pub async fn has_apns(&mut self) -> Result<bool, ApiError> {
        self.has_service(ServiceId::Apns).await
    }

    pub async fn has_music_kit(&mut self) -> Result<bool, ApiError> {
        self.has_service(ServiceId::MusicKit).await
    }

    pub async fn has_device_check(&mut self) -> Result<bool, ApiError> {
        self.has_service(ServiceId::DeviceCheck).await
    }

    /// Fetches this key again, replacing our record wholesale.
    /// On failure, the existing record is untouched.
    pub async fn reload(&mut self) -> Result<(), ApiError> {
        tracing::debug!(key_id = %self.record.id, "reloading key");
        self.record = fetch(self.client.as_ref(), &self.record.id).await?;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn can_download(&self) -> bool {
        self.record.can_download
    }

    pub fn can_revoke(&self) -> bool {
        self.record.can_revoke
    }

    /// The underlying record, exactly as last fetched.
    pub fn raw_data(&self) -> &KeyRecord {
        &self.record
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("record", &self.record).finish()
    }
}

/// Fetches a key by id, refusing a record that describes some other key.
async fn fetch(client: &dyn KeyApi, id: &str) -> Result<KeyRecord, ApiError> {
    let record = client.get_key(id).await?;
    if record.id != id {
        tracing::warn!(requested = id, returned = %record.id, "portal returned a different key");
        return Err(ApiError::not_found(id));
    }
    Ok(record)
}

/// Builds the service configuration for a new key.
/// MusicKit is the only service which takes any configuration: its identifier.
fn service_configs(
    enable_apns: bool,
    enable_device_check: bool,
    music_kit_id: Option<&str>,
) -> ServiceConfigs {
    let mut configs = ServiceConfigs::new();
    if enable_apns {
        configs.insert(ServiceId::Apns, Vec::new());
    }
    if enable_device_check {
        configs.insert(ServiceId::DeviceCheck, Vec::new());
    }
    if let Some(music_kit_id) = music_kit_id {
        configs.insert(ServiceId::MusicKit, vec![Value::from(music_kit_id)]);
    }
    configs
}
