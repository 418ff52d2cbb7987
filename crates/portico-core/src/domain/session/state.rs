//! The owned session state container
//!
//! All fields are private; mutation happens only through the declared
//! primitives, and reads through the derived getters. Mutations are
//! synchronous in-memory assignments with no side effects, so a write-lock
//! holder commits each change atomically.

use crate::domain::reference::{Country, Currency, LanguageDefinition};
use crate::domain::session::types::{Organization, Role, SessionSummary, Warehouse};

/// In-memory session/authorization state
#[derive(Debug, Default)]
pub struct SessionState {
    token: String,
    name: String,
    user_uuid: String,
    avatar: String,
    introduction: String,
    role: Option<Role>,
    roles_list: Vec<Role>,
    role_names: Vec<String>,
    organizations_list: Vec<Organization>,
    organization: Option<Organization>,
    warehouses_list: Vec<Warehouse>,
    warehouse: Option<Warehouse>,
    languages_list: Vec<LanguageDefinition>,
    is_session: bool,
    session_info: Option<SessionSummary>,
    country: Option<Country>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the persisted token at construction, mirroring a page reload
    pub fn with_token(token: Option<String>) -> Self {
        Self {
            token: token.unwrap_or_default(),
            ..Self::default()
        }
    }

    // ========== Mutation primitives ==========

    pub fn set_token(&mut self, token: String) {
        self.token = token;
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn set_user_uuid(&mut self, uuid: String) {
        self.user_uuid = uuid;
    }

    pub fn set_avatar(&mut self, avatar: String) {
        self.avatar = avatar;
    }

    pub fn set_introduction(&mut self, introduction: String) {
        self.introduction = introduction;
    }

    pub fn set_role(&mut self, role: Option<Role>) {
        self.role = role;
    }

    pub fn set_roles_list(&mut self, roles: Vec<Role>) {
        self.roles_list = roles;
    }

    pub fn set_role_names(&mut self, names: Vec<String>) {
        self.role_names = names;
    }

    /// Replace the organizations list and the current selection together
    pub fn set_organizations(&mut self, list: Vec<Organization>, current: Option<Organization>) {
        self.organizations_list = list;
        self.organization = current;
    }

    pub fn set_organization(&mut self, organization: Option<Organization>) {
        self.organization = organization;
    }

    /// Replace the warehouses list and the current selection together
    pub fn set_warehouses(&mut self, list: Vec<Warehouse>, current: Option<Warehouse>) {
        self.warehouses_list = list;
        self.warehouse = current;
    }

    pub fn set_warehouse(&mut self, warehouse: Option<Warehouse>) {
        self.warehouse = warehouse;
    }

    pub fn set_session_active(&mut self, active: bool) {
        self.is_session = active;
    }

    pub fn set_session_info(&mut self, info: Option<SessionSummary>) {
        self.session_info = info;
    }

    pub fn set_country(&mut self, country: Option<Country>) {
        self.country = country;
    }

    /// Ingest the languages list, normalizing date/time patterns once.
    /// The stored list is treated as immutable afterwards.
    pub fn set_languages(&mut self, languages: Vec<LanguageDefinition>) {
        self.languages_list = languages
            .into_iter()
            .map(LanguageDefinition::normalized)
            .collect();
    }

    /// Local invalidation: drop the token and every role trace
    pub fn clear_authentication(&mut self) {
        self.token.clear();
        self.role = None;
        self.roles_list.clear();
        self.role_names.clear();
    }

    // ========== Derived getters ==========

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn user_uuid(&self) -> &str {
        &self.user_uuid
    }

    pub fn avatar(&self) -> &str {
        &self.avatar
    }

    pub fn introduction(&self) -> &str {
        &self.introduction
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    pub fn roles_list(&self) -> &[Role] {
        &self.roles_list
    }

    pub fn role_names(&self) -> &[String] {
        &self.role_names
    }

    pub fn organizations(&self) -> &[Organization] {
        &self.organizations_list
    }

    pub fn organization(&self) -> Option<&Organization> {
        self.organization.as_ref()
    }

    pub fn warehouses(&self) -> &[Warehouse] {
        &self.warehouses_list
    }

    pub fn warehouse(&self) -> Option<&Warehouse> {
        self.warehouse.as_ref()
    }

    pub fn is_session(&self) -> bool {
        self.is_session
    }

    pub fn session_info(&self) -> Option<&SessionSummary> {
        self.session_info.as_ref()
    }

    pub fn country(&self) -> Option<&Country> {
        self.country.as_ref()
    }

    /// Current currency, defaulting to `{ USD, 2 }` until a country with a
    /// currency has been loaded
    pub fn currency(&self) -> Currency {
        self.country
            .as_ref()
            .and_then(|country| country.currency.clone())
            .unwrap_or_default()
    }

    /// Hyphenated locale tag of the current country's language
    pub fn country_language(&self) -> Option<String> {
        self.country.as_ref().map(Country::language_tag)
    }

    pub fn languages_list(&self) -> &[LanguageDefinition] {
        &self.languages_list
    }

    /// The language definition matching the current country's language
    pub fn current_language_definition(&self) -> Option<&LanguageDefinition> {
        let country = self.country.as_ref()?;
        self.languages_list
            .iter()
            .find(|definition| definition.language == country.language)
    }

    /// Personal-lock flag read off the current role
    pub fn is_personal_lock(&self) -> bool {
        self.role
            .as_ref()
            .map(|role| role.is_personal_lock)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(uuid: &str) -> Role {
        Role {
            uuid: uuid.to_string(),
            name: format!("Role {}", uuid),
            ..Default::default()
        }
    }

    #[test]
    fn test_currency_defaults_before_country_loads() {
        let state = SessionState::new();
        let currency = state.currency();
        assert_eq!(currency.iso_code, "USD");
        assert_eq!(currency.std_precision, 2);
    }

    #[test]
    fn test_currency_from_loaded_country() {
        let mut state = SessionState::new();
        state.set_country(Some(Country {
            id: 100,
            language: "de_DE".to_string(),
            currency: Some(Currency {
                iso_code: "EUR".to_string(),
                std_precision: 2,
            }),
            ..Default::default()
        }));

        assert_eq!(state.currency().iso_code, "EUR");
        assert_eq!(state.country_language().as_deref(), Some("de-DE"));
    }

    #[test]
    fn test_languages_normalized_at_ingestion() {
        let mut state = SessionState::new();
        state.set_languages(vec![LanguageDefinition {
            language: "en_US".to_string(),
            language_name: "English (USA)".to_string(),
            date_pattern: "MM/dd/yyyy".to_string(),
            time_pattern: "hh:mm:ss aa".to_string(),
        }]);

        let stored = &state.languages_list()[0];
        assert_eq!(stored.date_pattern, "MM/DD/YYYY");
        assert_eq!(stored.time_pattern, "hh:mm:ss A");
    }

    #[test]
    fn test_current_language_definition_matches_country() {
        let mut state = SessionState::new();
        state.set_languages(vec![
            LanguageDefinition {
                language: "en_US".to_string(),
                ..Default::default()
            },
            LanguageDefinition {
                language: "es_MX".to_string(),
                ..Default::default()
            },
        ]);
        state.set_country(Some(Country {
            language: "es_MX".to_string(),
            ..Default::default()
        }));

        let definition = state.current_language_definition().unwrap();
        assert_eq!(definition.language, "es_MX");
    }

    #[test]
    fn test_clear_authentication() {
        let mut state = SessionState::with_token(Some("token-1".to_string()));
        state.set_role(Some(role("r1")));
        state.set_roles_list(vec![role("r1"), role("r2")]);
        state.set_role_names(vec!["Role r1".to_string(), "Role r2".to_string()]);

        state.clear_authentication();

        assert_eq!(state.token(), "");
        assert!(state.role().is_none());
        assert!(state.roles_list().is_empty());
        assert!(state.role_names().is_empty());
    }

    #[test]
    fn test_is_personal_lock_without_role() {
        let state = SessionState::new();
        assert!(!state.is_personal_lock());
    }

    #[test]
    fn test_is_personal_lock_with_role() {
        let mut state = SessionState::new();
        let mut locked = role("r1");
        locked.is_personal_lock = true;
        state.set_role(Some(locked));
        assert!(state.is_personal_lock());
    }
}
