//! Router collaborator
//!
//! The router owns the navigable routes; the session layer only asks it to
//! reset, install freshly generated routes, and report the active route.
//! Route generation itself belongs to the permission collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Descriptor of a navigable route, as handed to the view-tab collaborator
/// when tabs are closed around a role/organization switch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub name: Option<String>,
    pub path: String,
    pub full_path: String,
    pub title: Option<String>,
}

/// Router surface consumed by the session coordinator
#[async_trait]
pub trait Router: Send + Sync {
    /// Drop all permission-generated routes, back to the logged-out set
    async fn reset(&self) -> Result<()>;

    /// Install newly generated routes
    async fn add_routes(&self, routes: Vec<RouteDescriptor>) -> Result<()>;

    /// Pull-based query of the currently active route, if any
    fn current_route(&self) -> Option<RouteDescriptor>;
}
