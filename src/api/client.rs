use async_trait::async_trait;
use reqwest::{header, RequestBuilder};
use serde::Serialize;
use url::Url;

use super::{http_client, ApiError, Envelope, KeyApi, Refusal};
use crate::config::{normalize_base_url, ConfigError, PortalConfig};
use crate::portal::{KeyRecord, ServiceConfigs};

const LIST_ENDPOINT: &str = "account/auth/key/list";
const GET_ENDPOINT: &str = "account/auth/key/get";
const CREATE_ENDPOINT: &str = "account/auth/key/create";
const REVOKE_ENDPOINT: &str = "account/auth/key/revoke";
const DOWNLOAD_ENDPOINT: &str = "account/auth/key/download";

/// A client for the key endpoints of the developer portal.
///
/// Authentication isn't handled here: if the portal requires a session,
/// it must already exist and be provided via `PortalConfig::session`.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    /// Always ends in `/`, so endpoints join beneath it.
    base_url: Url,
    team_id: String,
    session: Option<String>,
    page_size: u32,
}

/// The body posted when creating a key.
#[derive(Serialize, Debug)]
struct CreateKeyRequest<'a> {
    name: &'a str,
    #[serde(rename = "serviceConfigurations")]
    service_configurations: &'a ServiceConfigs,
    #[serde(rename = "teamId")]
    team_id: &'a str,
}

impl PortalClient {
    pub fn new(config: &PortalConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(&config.base_url)?,
            team_id: config.team_id.clone(),
            session: config.session.clone(),
            page_size: config.page_size.max(1),
        })
    }

    /// Begins a request against the given endpoint, relative to our base URL.
    fn request(&self, method: reqwest::Method, endpoint: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.base_url.join(endpoint)?;
        tracing::debug!(%method, %url, "sending portal request");

        let mut request = self.http.request(method, url);
        if let Some(session) = &self.session {
            request = request.header(header::COOKIE, session);
        }
        Ok(request)
    }

    /// POSTs a form to the given endpoint, returning its (successful) envelope.
    async fn post_form(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
        key_id: Option<&str>,
        refusal: Refusal<'_>,
    ) -> Result<Envelope, ApiError> {
        let request = self
            .request(reqwest::Method::POST, endpoint)?
            .header(header::ACCEPT, "application/json")
            .form(form);

        let body = http_client::send(request, key_id).await?;
        Envelope::parse(&body)?.ensure_success(refusal)
    }
}

#[async_trait]
impl KeyApi for PortalClient {
    async fn list_keys(&self) -> Result<Vec<KeyRecord>, ApiError> {
        let page_size = self.page_size.to_string();
        let mut keys = Vec::new();
        let mut page_number: u32 = 1;

        // Keep going until we're handed a page that isn't full.
        loop {
            let current_page = page_number.to_string();
            let page = self
                .post_form(
                    LIST_ENDPOINT,
                    &[
                        ("teamId", self.team_id.as_str()),
                        ("pageNumber", current_page.as_str()),
                        ("pageSize", page_size.as_str()),
                        ("sort", "name=asc"),
                    ],
                    None,
                    Refusal::Portal,
                )
                .await?
                .into_keys()?;

            let fetched = page.len();
            keys.extend(page);
            if fetched < self.page_size as usize {
                break;
            }
            page_number += 1;
        }

        tracing::debug!(count = keys.len(), "listed keys");
        Ok(keys)
    }

    async fn get_key(&self, id: &str) -> Result<KeyRecord, ApiError> {
        // The portal responds with a list that should contain only our key.
        // Anything else in it is not the key we asked for.
        self.post_form(
            GET_ENDPOINT,
            &[("teamId", self.team_id.as_str()), ("keyId", id)],
            Some(id),
            Refusal::NotFound(id),
        )
        .await?
        .into_keys()?
        .into_iter()
        .find(|key| key.id == id)
        .ok_or_else(|| ApiError::not_found(id))
    }

    async fn create_key(
        &self,
        name: &str,
        service_configs: &ServiceConfigs,
    ) -> Result<KeyRecord, ApiError> {
        let posted_contents = serde_json::to_string(&CreateKeyRequest {
            name,
            service_configurations: service_configs,
            team_id: &self.team_id,
        })?;

        let request = self
            .request(reqwest::Method::POST, CREATE_ENDPOINT)?
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .body(posted_contents);

        let body = http_client::send(request, None).await?;
        let created = Envelope::parse(&body)?
            .ensure_success(Refusal::Portal)?
            .into_keys()?
            .into_iter()
            .next();

        match created {
            Some(key) => {
                tracing::info!(key_id = %key.id, name, "created key");
                Ok(key)
            }
            None => Err(ApiError::MissingKey {
                endpoint: CREATE_ENDPOINT,
            }),
        }
    }

    async fn revoke_key(&self, id: &str) -> Result<(), ApiError> {
        self.post_form(
            REVOKE_ENDPOINT,
            &[("teamId", self.team_id.as_str()), ("keyId", id)],
            Some(id),
            Refusal::Permission,
        )
        .await?;

        tracing::info!(key_id = id, "revoked key");
        Ok(())
    }

    async fn download_key(&self, id: &str) -> Result<String, ApiError> {
        let request = self
            .request(reqwest::Method::GET, DOWNLOAD_ENDPOINT)?
            .query(&[("teamId", self.team_id.as_str()), ("keyId", id)]);

        let body = http_client::send(request, Some(id)).await?;

        // Key material is returned as-is, but refusals come back as an envelope.
        if let Ok(envelope) = Envelope::parse(&body) {
            envelope.ensure_success(Refusal::Permission)?;
        }
        Ok(body)
    }
}
