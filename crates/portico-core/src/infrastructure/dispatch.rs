//! Sibling state-module collaborators
//!
//! The original console reaches these modules through a cross-store
//! dispatch bus; here each concern is an injected capability object with
//! one async method, so the coordinator never touches a global dispatcher.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{error, info};

use crate::Result;
use crate::infrastructure::router::RouteDescriptor;

/// Business-data cache of the console (windows, records)
#[async_trait]
pub trait BusinessDataCache: Send + Sync {
    /// Drop every cached business record
    async fn reset(&self) -> Result<()>;
}

/// Dictionary cache (window/process/browser metadata)
#[async_trait]
pub trait DictionaryCache: Send + Sync {
    /// Drop the cached dictionary definitions
    async fn reset(&self) -> Result<()>;
}

/// Navigational view tabs of the console
#[async_trait]
pub trait ViewTabs: Send + Sync {
    /// Close every open tab
    async fn close_all(&self, current: Option<RouteDescriptor>) -> Result<()>;

    /// Close every tab except the one showing `current`
    async fn close_others(&self, current: Option<RouteDescriptor>) -> Result<()>;
}

/// Permission-scoped route generation
#[async_trait]
pub trait PermissionRoutes: Send + Sync {
    /// Generate the route set for the current permissions, optionally
    /// scoped to an organization
    async fn generate_routes(&self, organization_id: Option<i32>) -> Result<Vec<RouteDescriptor>>;
}

/// Sink for the session's default context values
#[async_trait]
pub trait PreferenceSink: Send + Sync {
    /// Record multiple context preferences at once
    async fn set_multiple(&self, values: HashMap<String, serde_json::Value>) -> Result<()>;
}

/// User-visible notifications
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Notifier that routes messages to the tracing sink
///
/// Useful as a default when no UI notifier is wired up.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(message, "notification");
    }

    fn error(&self, message: &str) {
        error!(message, "notification");
    }
}
