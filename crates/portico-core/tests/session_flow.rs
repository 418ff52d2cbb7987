//! End-to-end workflow tests for the session coordinator, run against
//! in-memory collaborator fakes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use portico_core::domain::reference::Country;
use portico_core::domain::session::{
    Collaborators, Organization, Role, SessionCoordinator, Warehouse,
};
use portico_core::error::{Error, Result};
use portico_core::infrastructure::api::{
    ChangeRoleRequest, ChangeRoleResponse, LoginResponse, SessionApi, SessionInfoResponse,
    SessionUserInfo, UserInfoResponse,
};
use portico_core::infrastructure::credentials::{CredentialStore, InMemoryCredentialStore};
use portico_core::infrastructure::dispatch::{
    BusinessDataCache, DictionaryCache, Notifier, PermissionRoutes, PreferenceSink, ViewTabs,
};
use portico_core::infrastructure::router::{RouteDescriptor, Router};

// ========== Fakes ==========

#[derive(Default)]
struct FakeApi {
    login_token: Mutex<Option<String>>,
    session: Mutex<Option<SessionInfoResponse>>,
    roles: Mutex<Vec<Role>>,
    organizations: Mutex<Vec<Organization>>,
    warehouses: Mutex<Vec<Warehouse>>,
    country: Mutex<Option<Country>>,
    change_role: Mutex<Option<ChangeRoleResponse>>,
    fail_logout: bool,
    fail_change_role: bool,
    organization_calls: AtomicUsize,
    warehouse_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

fn backend_error(message: &str) -> Error {
    Error::Api {
        code: 16,
        message: message.to_string(),
    }
}

#[async_trait]
impl SessionApi for FakeApi {
    async fn login(&self, _user_name: &str, _password: &str) -> Result<LoginResponse> {
        match self.login_token.lock().clone() {
            Some(uuid) => Ok(LoginResponse { uuid }),
            None => Err(Error::Authentication(
                "invalid user name or password".to_string(),
            )),
        }
    }

    async fn logout(&self, _token: &str) -> Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout {
            return Err(backend_error("session already gone"));
        }
        Ok(())
    }

    async fn session_info(&self, _session_uuid: &str) -> Result<SessionInfoResponse> {
        self.session
            .lock()
            .clone()
            .ok_or_else(|| backend_error("session not found"))
    }

    async fn user_info(&self, _session_uuid: &str) -> Result<UserInfoResponse> {
        Ok(UserInfoResponse {
            uuid: "user-1".to_string(),
            name: "Alice".to_string(),
            description: "admin".to_string(),
            roles_list: self.roles.lock().clone(),
        })
    }

    async fn change_role(&self, _request: ChangeRoleRequest) -> Result<ChangeRoleResponse> {
        if self.fail_change_role {
            return Err(backend_error("role is not assigned to this user"));
        }
        self.change_role
            .lock()
            .clone()
            .ok_or_else(|| backend_error("no role change configured"))
    }

    async fn organizations(&self, _role_uuid: &str) -> Result<Vec<Organization>> {
        self.organization_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.organizations.lock().clone())
    }

    async fn warehouses(&self, _organization_uuid: &str) -> Result<Vec<Warehouse>> {
        self.warehouse_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.warehouses.lock().clone())
    }

    async fn country(&self, _id: Option<i32>, _uuid: Option<&str>) -> Result<Country> {
        self.country
            .lock()
            .clone()
            .ok_or_else(|| backend_error("country not found"))
    }

    async fn list_languages(
        &self,
        _page_token: Option<&str>,
        _page_size: Option<i32>,
    ) -> Result<Vec<portico_core::domain::reference::LanguageDefinition>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct FakeRouter {
    reset_calls: AtomicUsize,
    installed: Mutex<Vec<Vec<RouteDescriptor>>>,
    current: Mutex<Option<RouteDescriptor>>,
}

#[async_trait]
impl Router for FakeRouter {
    async fn reset(&self) -> Result<()> {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn add_routes(&self, routes: Vec<RouteDescriptor>) -> Result<()> {
        self.installed.lock().push(routes);
        Ok(())
    }

    fn current_route(&self) -> Option<RouteDescriptor> {
        self.current.lock().clone()
    }
}

#[derive(Default)]
struct FakeCache {
    resets: AtomicUsize,
}

#[async_trait]
impl BusinessDataCache for FakeCache {
    async fn reset(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl DictionaryCache for FakeCache {
    async fn reset(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakeViewTabs {
    close_all_calls: AtomicUsize,
    close_others_calls: AtomicUsize,
}

#[async_trait]
impl ViewTabs for FakeViewTabs {
    async fn close_all(&self, _current: Option<RouteDescriptor>) -> Result<()> {
        self.close_all_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close_others(&self, _current: Option<RouteDescriptor>) -> Result<()> {
        self.close_others_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakePermissions {
    requests: Mutex<Vec<Option<i32>>>,
}

#[async_trait]
impl PermissionRoutes for FakePermissions {
    async fn generate_routes(&self, organization_id: Option<i32>) -> Result<Vec<RouteDescriptor>> {
        self.requests.lock().push(organization_id);
        Ok(vec![RouteDescriptor {
            name: Some("dashboard".to_string()),
            path: "/dashboard".to_string(),
            full_path: "/dashboard".to_string(),
            title: Some("Dashboard".to_string()),
        }])
    }
}

#[derive(Default)]
struct FakePreferences {
    received: Mutex<Vec<HashMap<String, Value>>>,
}

#[async_trait]
impl PreferenceSink for FakePreferences {
    async fn set_multiple(&self, values: HashMap<String, Value>) -> Result<()> {
        self.received.lock().push(values);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.messages
            .lock()
            .push(("success".to_string(), message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages
            .lock()
            .push(("error".to_string(), message.to_string()));
    }
}

// ========== Harness ==========

struct Harness {
    coordinator: SessionCoordinator,
    api: Arc<FakeApi>,
    credentials: Arc<InMemoryCredentialStore>,
    router: Arc<FakeRouter>,
    business_data: Arc<FakeCache>,
    dictionary: Arc<FakeCache>,
    view_tabs: Arc<FakeViewTabs>,
    permissions: Arc<FakePermissions>,
    preferences: Arc<FakePreferences>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(api: FakeApi, credentials: InMemoryCredentialStore) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("portico_core=debug")
        .with_test_writer()
        .try_init();

    let api = Arc::new(api);
    let credentials = Arc::new(credentials);
    let router = Arc::new(FakeRouter::default());
    let business_data = Arc::new(FakeCache::default());
    let dictionary = Arc::new(FakeCache::default());
    let view_tabs = Arc::new(FakeViewTabs::default());
    let permissions = Arc::new(FakePermissions::default());
    let preferences = Arc::new(FakePreferences::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let coordinator = SessionCoordinator::new(Collaborators {
        api: api.clone(),
        credentials: credentials.clone(),
        router: router.clone(),
        business_data: business_data.clone(),
        dictionary: dictionary.clone(),
        view_tabs: view_tabs.clone(),
        permissions: permissions.clone(),
        preferences: preferences.clone(),
        notifier: notifier.clone(),
    });

    Harness {
        coordinator,
        api,
        credentials,
        router,
        business_data,
        dictionary,
        view_tabs,
        permissions,
        preferences,
        notifier,
    }
}

fn role(uuid: &str, name: &str) -> Role {
    Role {
        uuid: uuid.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

fn organization(uuid: &str, id: i32) -> Organization {
    Organization {
        id,
        uuid: uuid.to_string(),
        name: format!("Org {}", uuid),
    }
}

fn warehouse(uuid: &str, id: i32) -> Warehouse {
    Warehouse {
        id,
        uuid: uuid.to_string(),
        name: format!("Warehouse {}", uuid),
    }
}

fn session_response(token: &str, role: Role) -> SessionInfoResponse {
    SessionInfoResponse {
        id: 1000001,
        uuid: token.to_string(),
        name: "Alice".to_string(),
        processed: false,
        role,
        user_info: SessionUserInfo {
            uuid: "user-1".to_string(),
            name: "Alice".to_string(),
            description: "admin user".to_string(),
        },
        default_context_map: HashMap::from([
            ("#C_Country_ID".to_string(), json!(100)),
            ("#AD_Client_ID".to_string(), json!(11)),
        ]),
    }
}

// ========== Tests ==========

#[tokio::test]
async fn login_commits_token_to_memory_and_store() {
    let api = FakeApi {
        login_token: Mutex::new(Some("token-T".to_string())),
        ..Default::default()
    };
    let h = harness(api, InMemoryCredentialStore::new());

    h.coordinator.login("alice", "secret").await.unwrap();

    assert_eq!(h.coordinator.token(), "token-T");
    assert_eq!(h.credentials.token().as_deref(), Some("token-T"));
}

#[tokio::test]
async fn login_failure_propagates_and_stores_nothing() {
    let h = harness(FakeApi::default(), InMemoryCredentialStore::new());

    let error = h.coordinator.login("alice", "wrong").await.unwrap_err();
    assert_eq!(error.code(), "E001");
    assert!(h.credentials.token().is_none());
    assert_eq!(h.coordinator.token(), "");
}

#[tokio::test]
async fn session_establishment_cascades_to_first_org_and_warehouse() {
    // login("alice","secret") -> token T; getSessionInfo(T) yields role R1
    // with orgs [O1, O2], nothing persisted -> O1 selected; warehouses of
    // O1 are [W1] -> W1 selected.
    let api = FakeApi {
        login_token: Mutex::new(Some("T".to_string())),
        session: Mutex::new(Some(session_response("T", role("R1", "Admin")))),
        roles: Mutex::new(vec![role("R1", "Admin")]),
        organizations: Mutex::new(vec![organization("O1", 1), organization("O2", 2)]),
        warehouses: Mutex::new(vec![warehouse("W1", 10)]),
        country: Mutex::new(Some(Country::default())),
        ..Default::default()
    };
    let h = harness(api, InMemoryCredentialStore::new());

    h.coordinator.login("alice", "secret").await.unwrap();
    let outcome = h.coordinator.get_session_info(Some("T".to_string())).await.unwrap();

    assert_eq!(outcome.name, "Alice");
    // #Date was injected before the context left the coordinator
    assert!(outcome.default_context.contains_key("#Date"));
    let forwarded = h.preferences.received.lock();
    assert_eq!(forwarded.len(), 1);
    assert!(forwarded[0].contains_key("#Date"));
    drop(forwarded);

    assert!(h.coordinator.is_session());
    assert_eq!(h.coordinator.role().unwrap().uuid, "R1");
    assert_eq!(h.credentials.current_role().as_deref(), Some("R1"));

    // Organization cascade picked the first entry and persisted it
    assert_eq!(h.coordinator.organization().unwrap().uuid, "O1");
    assert_eq!(h.credentials.current_organization().as_deref(), Some("O1"));

    // Warehouse cascade ran for O1
    assert_eq!(h.coordinator.warehouse().unwrap().uuid, "W1");
    assert_eq!(h.credentials.current_warehouse().as_deref(), Some("W1"));
}

#[tokio::test]
async fn organizations_selection_prefers_persisted_entry() {
    let api = FakeApi {
        organizations: Mutex::new(vec![organization("O1", 1), organization("O2", 2)]),
        warehouses: Mutex::new(vec![warehouse("W1", 10)]),
        ..Default::default()
    };
    let credentials =
        InMemoryCredentialStore::with_persisted(None, Some("R1"), Some("O2"), None);
    let h = harness(api, credentials);

    h.coordinator.get_organizations_list(None).await.unwrap();

    assert_eq!(h.coordinator.organization().unwrap().uuid, "O2");
    assert_eq!(h.credentials.current_organization().as_deref(), Some("O2"));
}

#[tokio::test]
async fn organizations_selection_falls_back_and_overwrites_persisted() {
    let api = FakeApi {
        organizations: Mutex::new(vec![organization("O1", 1), organization("O2", 2)]),
        warehouses: Mutex::new(vec![warehouse("W1", 10)]),
        ..Default::default()
    };
    // Persisted organization no longer exists in the fetched list
    let credentials =
        InMemoryCredentialStore::with_persisted(None, Some("R1"), Some("O-stale"), None);
    let h = harness(api, credentials);

    h.coordinator.get_organizations_list(None).await.unwrap();

    assert_eq!(h.coordinator.organization().unwrap().uuid, "O1");
    assert_eq!(h.credentials.current_organization().as_deref(), Some("O1"));
}

#[tokio::test]
async fn empty_organizations_list_clears_selection_and_persistence() {
    let api = FakeApi::default();
    let credentials =
        InMemoryCredentialStore::with_persisted(None, Some("R1"), Some("O1"), Some("W1"));
    let h = harness(api, credentials);

    h.coordinator.get_organizations_list(None).await.unwrap();

    assert!(h.coordinator.organization().is_none());
    assert!(h.credentials.current_organization().is_none());
    // No organization selected, so the warehouse cascade never ran
    assert_eq!(h.api.warehouse_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn change_warehouse_is_local_only() {
    let api = FakeApi {
        warehouses: Mutex::new(vec![warehouse("W1", 10), warehouse("W2", 20)]),
        ..Default::default()
    };
    let credentials = InMemoryCredentialStore::with_persisted(None, None, Some("O1"), None);
    let h = harness(api, credentials);

    // Load the list once, then switch locally
    h.coordinator.get_warehouses_list(None).await.unwrap();
    let network_calls = h.api.warehouse_calls.load(Ordering::SeqCst);

    h.coordinator.change_warehouse("W2").unwrap();

    assert_eq!(h.api.warehouse_calls.load(Ordering::SeqCst), network_calls);
    assert_eq!(h.coordinator.warehouse().unwrap().uuid, "W2");
    assert_eq!(h.credentials.current_warehouse().as_deref(), Some("W2"));
}

#[tokio::test]
async fn change_organization_uses_loaded_list_and_regenerates_routes() {
    let api = FakeApi {
        organizations: Mutex::new(vec![organization("O1", 1), organization("O2", 2)]),
        warehouses: Mutex::new(vec![warehouse("W1", 10)]),
        ..Default::default()
    };
    let credentials = InMemoryCredentialStore::with_persisted(None, Some("R1"), None, None);
    let h = harness(api, credentials);

    h.coordinator.get_organizations_list(None).await.unwrap();
    let org_fetches = h.api.organization_calls.load(Ordering::SeqCst);

    h.coordinator.change_organization("O2", 2, true).await.unwrap();

    // Switch came from the loaded list; no organizations refetch
    assert_eq!(h.api.organization_calls.load(Ordering::SeqCst), org_fetches);
    assert_eq!(h.coordinator.organization().unwrap().uuid, "O2");
    assert_eq!(h.view_tabs.close_all_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.router.reset_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.permissions.requests.lock().as_slice(), &[Some(2)]);
    assert_eq!(h.router.installed.lock().len(), 1);
}

#[tokio::test]
async fn logout_resolves_even_when_server_logout_fails() {
    let api = FakeApi {
        fail_logout: true,
        ..Default::default()
    };
    let credentials =
        InMemoryCredentialStore::with_persisted(Some("T"), Some("R1"), None, None);
    let h = harness(api, credentials);

    h.coordinator.logout().await.unwrap();

    assert_eq!(h.coordinator.token(), "");
    assert!(h.coordinator.role_names().is_empty());
    assert!(!h.coordinator.is_session());
    assert!(h.credentials.token().is_none());
    assert!(h.credentials.current_role().is_none());
    assert_eq!(h.business_data.resets.load(Ordering::SeqCst), 1);
    assert_eq!(h.dictionary.resets.load(Ordering::SeqCst), 1);
    assert_eq!(h.view_tabs.close_all_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.router.reset_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn change_role_success_commits_new_token_and_regenerates_routes() {
    let api = FakeApi {
        session: Mutex::new(Some(session_response("T2", role("R2", "Sales")))),
        roles: Mutex::new(vec![role("R2", "Sales")]),
        change_role: Mutex::new(Some(ChangeRoleResponse {
            uuid: "T2".to_string(),
            role: role("R2", "Sales"),
        })),
        ..Default::default()
    };
    let credentials =
        InMemoryCredentialStore::with_persisted(Some("T1"), Some("R1"), None, None);
    let h = harness(api, credentials);

    let changed = h
        .coordinator
        .change_role("R2", None, None, true)
        .await
        .unwrap();

    assert_eq!(changed.session_uuid, "T2");
    assert_eq!(changed.role.uuid, "R2");
    assert_eq!(h.coordinator.token(), "T2");
    assert_eq!(h.credentials.token().as_deref(), Some("T2"));
    assert_eq!(h.credentials.current_role().as_deref(), Some("R2"));

    // Finally-path: router regenerated without an organization scope
    assert_eq!(h.router.reset_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.permissions.requests.lock().as_slice(), &[None]);
    assert_eq!(h.router.installed.lock().len(), 1);

    let messages = h.notifier.messages.lock();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "success");
}

#[tokio::test]
async fn change_role_failure_still_regenerates_routes() {
    let api = FakeApi {
        fail_change_role: true,
        ..Default::default()
    };
    let credentials =
        InMemoryCredentialStore::with_persisted(Some("T1"), Some("R1"), None, None);
    let h = harness(api, credentials);

    let error = h
        .coordinator
        .change_role("R2", None, None, false)
        .await
        .unwrap_err();
    assert_eq!(error.code(), "E300");

    // The previous role's routes must not survive the failed switch
    assert_eq!(h.router.reset_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.router.installed.lock().len(), 1);
    assert_eq!(h.view_tabs.close_others_calls.load(Ordering::SeqCst), 1);

    // Token and role selection are untouched
    assert_eq!(h.credentials.token().as_deref(), Some("T1"));
    assert_eq!(h.credentials.current_role().as_deref(), Some("R1"));

    let messages = h.notifier.messages.lock();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "error");
}

#[tokio::test]
async fn empty_roles_list_rejects_with_verification_error() {
    let api = FakeApi::default();
    let credentials = InMemoryCredentialStore::with_persisted(Some("T"), None, None, None);
    let h = harness(api, credentials);

    let error = h
        .coordinator
        .get_user_info_from_session(None)
        .await
        .unwrap_err();

    match error {
        Error::Verification { code, message } => {
            assert_eq!(code, 0);
            assert_eq!(message, "getInfo: roles must be a non-null array!");
        }
        other => panic!("expected verification error, got: {:?}", other),
    }
}

#[tokio::test]
async fn user_info_resolves_role_from_persisted_identifier() {
    let api = FakeApi {
        roles: Mutex::new(vec![role("R1", "Admin"), role("R2", "Sales")]),
        ..Default::default()
    };
    let credentials = InMemoryCredentialStore::with_persisted(Some("T"), Some("R2"), None, None);
    let h = harness(api, credentials);

    let outcome = h.coordinator.get_user_info_from_session(None).await.unwrap();

    assert_eq!(outcome.role_names, vec!["Admin", "Sales"]);
    assert_eq!(h.coordinator.role().unwrap().uuid, "R2");
    assert!(!outcome.avatar.is_empty());
}

#[tokio::test]
async fn currency_defaults_until_country_loads() {
    let api = FakeApi {
        country: Mutex::new(Some(Country {
            id: 100,
            language: "en_US".to_string(),
            currency: Some(portico_core::domain::reference::Currency {
                iso_code: "EUR".to_string(),
                std_precision: 2,
            }),
            ..Default::default()
        })),
        ..Default::default()
    };
    let h = harness(api, InMemoryCredentialStore::new());

    let currency = h.coordinator.currency();
    assert_eq!(currency.iso_code, "USD");
    assert_eq!(currency.std_precision, 2);

    h.coordinator
        .get_country_from_server(Some(100), None)
        .await
        .unwrap();
    assert_eq!(h.coordinator.currency().iso_code, "EUR");
    assert_eq!(h.coordinator.country_language().as_deref(), Some("en-US"));
}

#[tokio::test]
async fn reset_token_clears_locally_without_server_contact() {
    let api = FakeApi::default();
    let credentials = InMemoryCredentialStore::with_persisted(Some("T"), None, None, None);
    let h = harness(api, credentials);

    h.coordinator.reset_token().await.unwrap();

    assert_eq!(h.coordinator.token(), "");
    assert!(h.credentials.token().is_none());
    assert_eq!(h.api.logout_calls.load(Ordering::SeqCst), 0);
}
