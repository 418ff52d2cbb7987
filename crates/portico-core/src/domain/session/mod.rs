//! Session domain: entities, the owned state container, and the
//! coordinator that sequences the login / role-change workflows.

mod coordinator;
mod state;
mod types;

pub use coordinator::{
    Collaborators, RoleChanged, SessionCoordinator, SessionOutcome, UserInfoOutcome,
};
pub use state::SessionState;
pub use types::{Organization, Role, SessionSummary, UserProfile, Warehouse};
