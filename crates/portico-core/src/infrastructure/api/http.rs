//! Reqwest-backed session API client
//!
//! Thin JSON client for the ERP gateway. Owns no retry logic; a failed
//! call surfaces as an error and the caller decides what to swallow.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::domain::reference::{Country, LanguageDefinition};
use crate::domain::session::{Organization, Warehouse};
use crate::error::{Error, Result};

use super::{
    ChangeRoleRequest, ChangeRoleResponse, LoginResponse, SessionApi, SessionInfoResponse,
    UserInfoResponse,
};

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Error envelope the gateway returns on non-success statuses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OrganizationsListResponse {
    organizations_list: Vec<Organization>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WarehousesListResponse {
    warehouses_list: Vec<Warehouse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LanguagesListResponse {
    languages_list: Vec<LanguageDefinition>,
}

/// HTTP client for the session gateway
#[derive(Clone)]
pub struct HttpSessionApi {
    http_client: HttpClient,
    base_url: String,
}

impl std::fmt::Debug for HttpSessionApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSessionApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Builder for creating an HttpSessionApi
#[derive(Default)]
pub struct HttpSessionApiBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl HttpSessionApiBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gateway base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HttpSessionApi> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;
        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(HttpSessionApi {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl HttpSessionApi {
    /// Create a client from the application config
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        HttpSessionApiBuilder::new()
            .base_url(&config.base_url)
            .timeout_secs(config.timeout_secs)
            .build()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Decode a successful body or surface the gateway's error envelope
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let envelope: ApiErrorBody = serde_json::from_str(&body).unwrap_or(ApiErrorBody {
            code: status.as_u16() as i32,
            message: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        });
        debug!(status = %status, code = envelope.code, "gateway returned an error envelope");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }
        Err(Error::Api {
            code: envelope.code,
            message: envelope.message,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http_client
            .get(self.url(path))
            .query(query)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn login(&self, user_name: &str, password: &str) -> Result<LoginResponse> {
        let body = HashMap::from([("userName", user_name), ("password", password)]);
        let response = self
            .http_client
            .post(self.url("session/login"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication(
                "invalid user name or password".to_string(),
            ));
        }
        Self::decode(response).await
    }

    async fn logout(&self, token: &str) -> Result<()> {
        let body = HashMap::from([("sessionUuid", token)]);
        let _: serde_json::Value = self.post_json("session/logout", &body).await?;
        Ok(())
    }

    async fn session_info(&self, session_uuid: &str) -> Result<SessionInfoResponse> {
        self.get_json(
            "session/info",
            &[("sessionUuid", session_uuid.to_string())],
        )
        .await
    }

    async fn user_info(&self, session_uuid: &str) -> Result<UserInfoResponse> {
        self.get_json(
            "session/user-info",
            &[("sessionUuid", session_uuid.to_string())],
        )
        .await
    }

    async fn change_role(&self, request: ChangeRoleRequest) -> Result<ChangeRoleResponse> {
        self.post_json("session/change-role", &request).await
    }

    async fn organizations(&self, role_uuid: &str) -> Result<Vec<Organization>> {
        let response: OrganizationsListResponse = self
            .get_json(
                "system/organizations",
                &[("roleUuid", role_uuid.to_string())],
            )
            .await?;
        Ok(response.organizations_list)
    }

    async fn warehouses(&self, organization_uuid: &str) -> Result<Vec<Warehouse>> {
        let response: WarehousesListResponse = self
            .get_json(
                "system/warehouses",
                &[("organizationUuid", organization_uuid.to_string())],
            )
            .await?;
        Ok(response.warehouses_list)
    }

    async fn country(&self, id: Option<i32>, uuid: Option<&str>) -> Result<Country> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(id) = id {
            query.push(("id", id.to_string()));
        }
        if let Some(uuid) = uuid {
            query.push(("uuid", uuid.to_string()));
        }
        if query.is_empty() {
            return Err(Error::InvalidInput(
                "country lookup requires an id or a uuid".to_string(),
            ));
        }
        self.get_json("system/country", &query).await
    }

    async fn list_languages(
        &self,
        page_token: Option<&str>,
        page_size: Option<i32>,
    ) -> Result<Vec<LanguageDefinition>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        if let Some(size) = page_size {
            query.push(("pageSize", size.to_string()));
        }
        let response: LanguagesListResponse = self.get_json("system/languages", &query).await?;
        Ok(response.languages_list)
    }
}
