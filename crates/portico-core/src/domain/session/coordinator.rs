//! Session coordinator: sequences the login / session / role-change
//! workflows against the injected collaborators
//!
//! State mutations are synchronous and happen under the write lock;
//! awaits occur only at collaborator boundaries. Sub-fetches the caller
//! must not wait on (country lookup, user-info refresh, server-side
//! logout) are spawned and report failures to the tracing sink only.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::domain::reference::{Country, Currency, LanguageDefinition};
use crate::domain::session::state::SessionState;
use crate::domain::session::types::{Organization, Role, SessionSummary, Warehouse};
use crate::error::{Error, Result};
use crate::infrastructure::api::{ChangeRoleRequest, SessionApi};
use crate::infrastructure::credentials::CredentialStore;
use crate::infrastructure::dispatch::{
    BusinessDataCache, DictionaryCache, Notifier, PermissionRoutes, PreferenceSink, ViewTabs,
};
use crate::infrastructure::router::Router;

/// Context key the backend leaves unset; filled with "now" at establishment
const CONTEXT_DATE: &str = "#Date";

/// Context key carrying the session's country identifier
const CONTEXT_COUNTRY_ID: &str = "#C_Country_ID";

// TODO: replace once the user-info endpoint serves real avatars
const PLACEHOLDER_AVATAR: &str = "/images/avatar-placeholder.png";

/// Collaborators injected into the coordinator at construction
pub struct Collaborators {
    pub api: Arc<dyn SessionApi>,
    pub credentials: Arc<dyn CredentialStore>,
    pub router: Arc<dyn Router>,
    pub business_data: Arc<dyn BusinessDataCache>,
    pub dictionary: Arc<dyn DictionaryCache>,
    pub view_tabs: Arc<dyn ViewTabs>,
    pub permissions: Arc<dyn PermissionRoutes>,
    pub preferences: Arc<dyn PreferenceSink>,
    pub notifier: Arc<dyn Notifier>,
}

/// Result of a successful session establishment
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub name: String,
    pub default_context: HashMap<String, Value>,
}

/// Result of a successful user-info fetch
#[derive(Debug, Clone)]
pub struct UserInfoOutcome {
    pub roles_list: Vec<Role>,
    pub role_names: Vec<String>,
    pub avatar: String,
}

/// Result of a successful role change
#[derive(Debug, Clone)]
pub struct RoleChanged {
    pub role: Role,
    pub session_uuid: String,
}

/// Coordinator for session/authorization state
///
/// Cheap to clone; clones share the same state and collaborators.
#[derive(Clone)]
pub struct SessionCoordinator {
    state: Arc<RwLock<SessionState>>,
    api: Arc<dyn SessionApi>,
    credentials: Arc<dyn CredentialStore>,
    router: Arc<dyn Router>,
    business_data: Arc<dyn BusinessDataCache>,
    dictionary: Arc<dyn DictionaryCache>,
    view_tabs: Arc<dyn ViewTabs>,
    permissions: Arc<dyn PermissionRoutes>,
    preferences: Arc<dyn PreferenceSink>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("is_session", &self.state.read().is_session())
            .finish()
    }
}

impl SessionCoordinator {
    /// Create a coordinator, restoring any persisted token into memory
    pub fn new(collaborators: Collaborators) -> Self {
        let token = collaborators.credentials.token();
        Self {
            state: Arc::new(RwLock::new(SessionState::with_token(token))),
            api: collaborators.api,
            credentials: collaborators.credentials,
            router: collaborators.router,
            business_data: collaborators.business_data,
            dictionary: collaborators.dictionary,
            view_tabs: collaborators.view_tabs,
            permissions: collaborators.permissions,
            preferences: collaborators.preferences,
            notifier: collaborators.notifier,
        }
    }

    // ========== Login / session establishment ==========

    /// Authenticate; on success the token is committed to memory and to the
    /// credential store. Invalid credentials or network failures propagate
    /// unchanged; there is no retry.
    pub async fn login(&self, user_name: &str, password: &str) -> Result<()> {
        let response = self.api.login(user_name, password).await?;

        self.state.write().set_token(response.uuid.clone());
        self.credentials.set_token(&response.uuid)?;

        info!(user = user_name, "logged in");
        Ok(())
    }

    /// Establish the session context, defaulting to the persisted token.
    ///
    /// Commits session metadata, user fields, and the current role, then
    /// awaits the organizations cascade. The country lookup and the
    /// user-info refresh are started afterwards and not awaited; callers
    /// must not depend on their completion relative to this future.
    pub async fn get_session_info(&self, session_uuid: Option<String>) -> Result<SessionOutcome> {
        let session_uuid = match session_uuid.filter(|uuid| !uuid.is_empty()) {
            Some(uuid) => uuid,
            None => self.credentials.token().ok_or(Error::SessionExpired)?,
        };

        let response = match self.api.session_info(&session_uuid).await {
            Ok(response) => response,
            Err(error) => {
                warn!(code = error.code(), %error, "failed to establish session context");
                return Err(error);
            }
        };

        let role = response.role.clone();
        let mut default_context = response.default_context_map.clone();
        // The backend leaves #Date unset; it must hold "now" before the
        // context reaches any other module
        default_context.insert(CONTEXT_DATE.to_string(), json!(Utc::now().to_rfc3339()));

        {
            let mut state = self.state.write();
            state.set_session_active(true);
            state.set_session_info(Some(SessionSummary {
                id: response.id,
                uuid: response.uuid.clone(),
                name: response.name.clone(),
                processed: response.processed,
            }));
            state.set_name(response.name.clone());
            state.set_introduction(response.user_info.description.clone());
            state.set_user_uuid(response.user_info.uuid.clone());
            state.set_role(Some(role.clone()));
        }
        self.credentials.set_current_role(&role.uuid)?;

        if let Err(error) = self.preferences.set_multiple(default_context.clone()).await {
            warn!(code = error.code(), %error, "failed to propagate session context preferences");
        }

        self.get_organizations_list(Some(role.uuid.clone())).await?;

        // Fire and forget: country and user info load after this future
        // resolves, and their failures reach the log, never the caller
        let coordinator = self.clone();
        let country_id = context_i32(&default_context, CONTEXT_COUNTRY_ID);
        tokio::spawn(async move {
            match country_id {
                Some(id) => {
                    let _ = coordinator.get_country_from_server(Some(id), None).await;
                }
                None => info!("session context carries no country id"),
            }
        });

        let coordinator = self.clone();
        let uuid_for_user_info = session_uuid.clone();
        tokio::spawn(async move {
            if let Err(error) = coordinator
                .get_user_info_from_session(Some(uuid_for_user_info))
                .await
            {
                warn!(code = error.code(), %error, "user info fetch after session establishment failed");
            }
        });

        Ok(SessionOutcome {
            name: response.name,
            default_context,
        })
    }

    /// Fetch the user profile and available roles, defaulting to the
    /// persisted token.
    ///
    /// Rejects with a verification error when the roles list is empty. When
    /// no role is current yet, resolves it from the persisted identifier.
    pub async fn get_user_info_from_session(
        &self,
        session_uuid: Option<String>,
    ) -> Result<UserInfoOutcome> {
        let session_uuid = match session_uuid.filter(|uuid| !uuid.is_empty()) {
            Some(uuid) => uuid,
            None => self.credentials.token().ok_or(Error::SessionExpired)?,
        };

        let response = self.api.user_info(&session_uuid).await?;
        if response.roles_list.is_empty() {
            return Err(Error::verification(
                "getInfo: roles must be a non-null array!",
            ));
        }

        let role_names: Vec<String> = response
            .roles_list
            .iter()
            .map(|role| role.name.clone())
            .collect();

        {
            let mut state = self.state.write();
            state.set_roles_list(response.roles_list.clone());
            state.set_role_names(role_names.clone());

            if state.role().is_none() {
                let persisted = self.credentials.current_role();
                let role = response
                    .roles_list
                    .iter()
                    .find(|role| Some(role.uuid.as_str()) == persisted.as_deref())
                    .cloned();
                if let Some(role) = role {
                    state.set_role(Some(role));
                }
            }

            state.set_avatar(PLACEHOLDER_AVATAR.to_string());
        }

        Ok(UserInfoOutcome {
            roles_list: response.roles_list,
            role_names,
            avatar: PLACEHOLDER_AVATAR.to_string(),
        })
    }

    // ========== Logout / invalidation ==========

    /// Tear the session down locally, then inform the server best-effort.
    ///
    /// Every step is tolerant: a failing collaborator is logged and the
    /// logout still completes, so this never returns an error.
    pub async fn logout(&self) -> Result<()> {
        let token = {
            let mut state = self.state.write();
            let token = state.token().to_string();
            state.clear_authentication();
            state.set_session_active(false);
            state.set_session_info(None);
            token
        };

        if let Err(error) = self.credentials.remove_token() {
            warn!(code = error.code(), %error, "failed to remove persisted token");
        }
        if let Err(error) = self.business_data.reset().await {
            warn!(code = error.code(), %error, "business data reset failed during logout");
        }
        if let Err(error) = self.dictionary.reset().await {
            warn!(code = error.code(), %error, "dictionary reset failed during logout");
        }
        if let Err(error) = self.view_tabs.close_all(None).await {
            warn!(code = error.code(), %error, "failed to close view tabs during logout");
        }
        if let Err(error) = self.credentials.remove_current_role() {
            warn!(code = error.code(), %error, "failed to remove persisted role");
        }
        if let Err(error) = self.router.reset().await {
            warn!(code = error.code(), %error, "router reset failed during logout");
        }

        // Server-side invalidation is best-effort; the local logout holds
        // whether or not it lands
        if !token.is_empty() {
            let api = Arc::clone(&self.api);
            tokio::spawn(async move {
                if let Err(error) = api.logout(&token).await {
                    warn!(code = error.code(), %error, "server-side logout failed");
                }
            });
        }

        info!("logged out");
        Ok(())
    }

    /// Forced local invalidation (e.g. on auth errors from other API
    /// calls); never contacts the server
    pub async fn reset_token(&self) -> Result<()> {
        self.state.write().clear_authentication();
        self.credentials.remove_token()
    }

    // ========== Role / organization / warehouse cascades ==========

    /// Fetch the organizations visible to a role (defaulting to the
    /// persisted one) and select the current organization.
    ///
    /// The persisted selection wins when still present, otherwise the first
    /// entry; an empty list unsets the organization and clears the
    /// persisted identifier. Cascades into the warehouses fetch. Fetch
    /// failures are logged and swallowed, leaving prior state unchanged.
    pub async fn get_organizations_list(&self, role_uuid: Option<String>) -> Result<()> {
        let role_uuid = match role_uuid.or_else(|| self.credentials.current_role()) {
            Some(uuid) => uuid,
            None => {
                debug!("no current role, skipping organizations fetch");
                return Ok(());
            }
        };

        let list = match self.api.organizations(&role_uuid).await {
            Ok(list) => list,
            Err(error) => {
                warn!(code = error.code(), %error, "failed to fetch organizations list");
                return Ok(());
            }
        };

        let persisted = self.credentials.current_organization();
        let selected = select_persisted_or_first(&list, persisted.as_deref(), |org: &Organization| {
            &org.uuid
        });
        match &selected {
            Some(organization) => self.credentials.set_current_organization(&organization.uuid)?,
            None => self.credentials.remove_current_organization()?,
        }
        self.state.write().set_organizations(list, selected.clone());

        if let Some(organization) = selected {
            self.get_warehouses_list(Some(organization.uuid)).await?;
        }
        Ok(())
    }

    /// Switch the current organization from the already-loaded list; no
    /// refetch of organizations happens here.
    pub async fn change_organization(
        &self,
        organization_uuid: &str,
        organization_id: i32,
        is_close_all_views: bool,
    ) -> Result<()> {
        self.credentials.set_current_organization(organization_uuid)?;

        let organization = {
            let mut state = self.state.write();
            let organization = state
                .organizations()
                .iter()
                .find(|org| org.uuid == organization_uuid)
                .cloned();
            state.set_organization(organization.clone());
            organization
        };
        if organization.is_none() {
            warn!(organization_uuid, "organization not present in the loaded list");
        }

        self.get_warehouses_list(Some(organization_uuid.to_string()))
            .await?;

        let current = self.router.current_route();
        if is_close_all_views {
            self.view_tabs.close_all(current).await?;
        } else {
            self.view_tabs.close_others(current).await?;
        }

        self.regenerate_routes(Some(organization_id)).await?;

        info!(organization_uuid, "changed organization");
        Ok(())
    }

    /// Fetch the warehouses of an organization (defaulting to the persisted
    /// one) and select the current warehouse; same fallback and
    /// error-swallowing policy as the organizations fetch.
    pub async fn get_warehouses_list(&self, organization_uuid: Option<String>) -> Result<()> {
        let organization_uuid = match organization_uuid
            .or_else(|| self.credentials.current_organization())
        {
            Some(uuid) => uuid,
            None => {
                debug!("no current organization, skipping warehouses fetch");
                return Ok(());
            }
        };

        let list = match self.api.warehouses(&organization_uuid).await {
            Ok(list) => list,
            Err(error) => {
                warn!(code = error.code(), %error, "failed to fetch warehouses list");
                return Ok(());
            }
        };

        let persisted = self.credentials.current_warehouse();
        let selected =
            select_persisted_or_first(&list, persisted.as_deref(), |wh: &Warehouse| &wh.uuid);
        match &selected {
            Some(warehouse) => self.credentials.set_current_warehouse(&warehouse.uuid)?,
            None => self.credentials.remove_current_warehouse()?,
        }
        self.state.write().set_warehouses(list, selected);
        Ok(())
    }

    /// Pure local selection change from the already-loaded warehouses list;
    /// never issues a network call
    pub fn change_warehouse(&self, warehouse_uuid: &str) -> Result<()> {
        self.credentials.set_current_warehouse(warehouse_uuid)?;

        let mut state = self.state.write();
        let warehouse = state
            .warehouses()
            .iter()
            .find(|warehouse| warehouse.uuid == warehouse_uuid)
            .cloned();
        state.set_warehouse(warehouse);
        Ok(())
    }

    /// Switch the active role. The backend issues a fresh session token, so
    /// a successful change re-establishes the whole session context under
    /// the new token (unawaited) and resets the sibling caches.
    ///
    /// Whether the change succeeds or fails, the router is reset and
    /// regenerated so no routes from the previous role survive.
    pub async fn change_role(
        &self,
        role_uuid: &str,
        organization_uuid: Option<String>,
        warehouse_uuid: Option<String>,
        is_close_all_views: bool,
    ) -> Result<RoleChanged> {
        let current = self.router.current_route();
        if is_close_all_views {
            self.view_tabs.close_all(current).await?;
        } else {
            self.view_tabs.close_others(current).await?;
        }

        let session_uuid = self.credentials.token().ok_or(Error::SessionExpired)?;
        let request = ChangeRoleRequest {
            session_uuid,
            role_uuid: role_uuid.to_string(),
            organization_uuid,
            warehouse_uuid,
        };

        let outcome = self.apply_role_change(request).await;

        // Runs on success and failure alike; stale permission routes must
        // never survive a role switch
        if let Err(error) = self.regenerate_routes(None).await {
            warn!(code = error.code(), %error, "router regeneration after role change failed");
        }

        outcome
    }

    async fn apply_role_change(&self, request: ChangeRoleRequest) -> Result<RoleChanged> {
        match self.api.change_role(request).await {
            Ok(response) => {
                {
                    let mut state = self.state.write();
                    state.set_role(Some(response.role.clone()));
                    state.set_token(response.uuid.clone());
                }
                self.credentials.set_current_role(&response.role.uuid)?;
                self.credentials.set_token(&response.uuid)?;

                // Session context refresh under the new token; deliberately
                // unawaited, mirroring the cascades in get_session_info
                let coordinator = self.clone();
                let new_token = response.uuid.clone();
                tokio::spawn(async move {
                    if let Err(error) = coordinator.get_session_info(Some(new_token)).await {
                        warn!(code = error.code(), %error, "session refresh after role change failed");
                    }
                });

                if let Err(error) = self.business_data.reset().await {
                    warn!(code = error.code(), %error, "business data reset after role change failed");
                }
                if let Err(error) = self.dictionary.reset().await {
                    warn!(code = error.code(), %error, "dictionary reset after role change failed");
                }

                self.notifier.success("Role changed successfully");
                info!(role = %response.role.name, "changed role");

                Ok(RoleChanged {
                    role: response.role,
                    session_uuid: response.uuid,
                })
            }
            Err(error) => {
                self.notifier.error(&error.to_string());
                warn!(code = error.code(), %error, "role change failed");
                Err(error)
            }
        }
    }

    async fn regenerate_routes(&self, organization_id: Option<i32>) -> Result<()> {
        self.router.reset().await?;
        let routes = self.permissions.generate_routes(organization_id).await?;
        self.router.add_routes(routes).await?;
        Ok(())
    }

    // ========== Reference data ==========

    /// Resolve the country (and currency) definition; fetch failures are
    /// logged and swallowed, leaving prior state unchanged
    pub async fn get_country_from_server(
        &self,
        id: Option<i32>,
        uuid: Option<&str>,
    ) -> Result<Option<Country>> {
        match self.api.country(id, uuid).await {
            Ok(country) => {
                self.state.write().set_country(Some(country.clone()));
                Ok(Some(country))
            }
            Err(error) => {
                warn!(code = error.code(), %error, "failed to fetch country definition");
                Ok(None)
            }
        }
    }

    /// Load the supported languages, normalizing date/time patterns at
    /// ingestion; same swallow-on-failure policy
    pub async fn get_languages_from_server(&self) -> Result<Vec<LanguageDefinition>> {
        match self.api.list_languages(None, None).await {
            Ok(languages) => {
                let mut state = self.state.write();
                state.set_languages(languages);
                Ok(state.languages_list().to_vec())
            }
            Err(error) => {
                warn!(code = error.code(), %error, "failed to fetch languages list");
                Ok(Vec::new())
            }
        }
    }

    // ========== Derived views ==========

    /// Run a read closure against a state snapshot
    pub fn snapshot<R>(&self, read: impl FnOnce(&SessionState) -> R) -> R {
        read(&self.state.read())
    }

    pub fn is_session(&self) -> bool {
        self.state.read().is_session()
    }

    pub fn token(&self) -> String {
        self.state.read().token().to_string()
    }

    pub fn user_uuid(&self) -> String {
        self.state.read().user_uuid().to_string()
    }

    pub fn role(&self) -> Option<Role> {
        self.state.read().role().cloned()
    }

    pub fn role_names(&self) -> Vec<String> {
        self.state.read().role_names().to_vec()
    }

    pub fn organizations(&self) -> Vec<Organization> {
        self.state.read().organizations().to_vec()
    }

    pub fn organization(&self) -> Option<Organization> {
        self.state.read().organization().cloned()
    }

    pub fn warehouses(&self) -> Vec<Warehouse> {
        self.state.read().warehouses().to_vec()
    }

    pub fn warehouse(&self) -> Option<Warehouse> {
        self.state.read().warehouse().cloned()
    }

    pub fn country(&self) -> Option<Country> {
        self.state.read().country().cloned()
    }

    pub fn currency(&self) -> Currency {
        self.state.read().currency()
    }

    pub fn country_language(&self) -> Option<String> {
        self.state.read().country_language()
    }

    pub fn languages_list(&self) -> Vec<LanguageDefinition> {
        self.state.read().languages_list().to_vec()
    }

    pub fn current_language_definition(&self) -> Option<LanguageDefinition> {
        self.state.read().current_language_definition().cloned()
    }

    pub fn is_personal_lock(&self) -> bool {
        self.state.read().is_personal_lock()
    }
}

/// Persisted selection if still present in the fresh list, else the first
/// entry, else nothing
fn select_persisted_or_first<T: Clone>(
    list: &[T],
    persisted: Option<&str>,
    uuid: impl Fn(&T) -> &str,
) -> Option<T> {
    list.iter()
        .find(|item| Some(uuid(item)) == persisted)
        .or_else(|| list.first())
        .cloned()
}

/// Read an integer context value; the gateway serializes some identifiers
/// as strings
fn context_i32(context: &HashMap<String, Value>, key: &str) -> Option<i32> {
    match context.get(key)? {
        Value::Number(number) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
