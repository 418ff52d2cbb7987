//! Portico Core Library
//!
//! This crate provides the session and authorization state layer for the
//! Portico ERP administration console, including:
//! - Session state container (token, user, role, organization, warehouse)
//! - Login / session-establishment / logout / role-change workflows
//! - Role → organization → warehouse cascade selection
//! - Reference data (country, currency, languages)
//! - Collaborator seams for the session API, credential store, router,
//!   and sibling state modules

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::session::{Collaborators, SessionCoordinator, SessionState};
    pub use crate::error::{Error, Result};
}
