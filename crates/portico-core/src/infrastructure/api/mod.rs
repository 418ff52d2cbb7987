//! Session API collaborator
//!
//! The trait describes the remote surface the coordinator consumes; the
//! reqwest-backed implementation lives in [`http`].

mod http;

pub use http::{HttpSessionApi, HttpSessionApiBuilder};

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::domain::reference::{Country, LanguageDefinition};
use crate::domain::session::{Organization, Role, Warehouse};

/// Successful login payload; `uuid` is the session token
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub uuid: String,
}

/// Session context returned by the backend after establishment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionInfoResponse {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub processed: bool,
    pub role: Role,
    pub user_info: SessionUserInfo,
    /// Default context keys (`#Date`, `#C_Country_ID`, ...) for the session
    pub default_context_map: HashMap<String, serde_json::Value>,
}

/// User fields embedded in the session-info response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionUserInfo {
    pub uuid: String,
    pub name: String,
    pub description: String,
}

/// Full user-info payload, carrying the available roles
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfoResponse {
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub roles_list: Vec<Role>,
}

/// Role-change request; the backend issues a fresh session token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    pub session_uuid: String,
    pub role_uuid: String,
    pub organization_uuid: Option<String>,
    pub warehouse_uuid: Option<String>,
}

/// Role-change response: the new token and the now-current role
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleResponse {
    pub uuid: String,
    pub role: Role,
}

/// Remote session API surface consumed by the coordinator
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Authenticate and obtain a session token
    async fn login(&self, user_name: &str, password: &str) -> Result<LoginResponse>;

    /// Invalidate the session server-side
    async fn logout(&self, token: &str) -> Result<()>;

    /// Fetch session metadata, current role, and the default context map
    async fn session_info(&self, session_uuid: &str) -> Result<SessionInfoResponse>;

    /// Fetch the user profile and the list of available roles
    async fn user_info(&self, session_uuid: &str) -> Result<UserInfoResponse>;

    /// Switch the active role; issues a new session token
    async fn change_role(&self, request: ChangeRoleRequest) -> Result<ChangeRoleResponse>;

    /// Organizations visible to a role
    async fn organizations(&self, role_uuid: &str) -> Result<Vec<Organization>>;

    /// Warehouses belonging to an organization
    async fn warehouses(&self, organization_uuid: &str) -> Result<Vec<Warehouse>>;

    /// Country definition by id or uuid
    async fn country(&self, id: Option<i32>, uuid: Option<&str>) -> Result<Country>;

    /// Supported languages with their raw server-side patterns
    async fn list_languages(
        &self,
        page_token: Option<&str>,
        page_size: Option<i32>,
    ) -> Result<Vec<LanguageDefinition>>;
}
