//! Session entities and related types
//!
//! These mirror the JSON gateway's wire shapes, hence the camelCase
//! serde renames.

use serde::{Deserialize, Serialize};

/// Metadata of an established session, as returned by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSummary {
    /// Backend row identifier
    pub id: i64,

    /// Opaque session token; doubles as the bearer credential
    pub uuid: String,

    /// Display name of the session owner
    pub name: String,

    /// Whether the session has been fully processed server-side
    pub processed: bool,
}

/// Profile fields of the authenticated user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub avatar: String,
}

/// A role the user may act under
///
/// Exactly one role is current at a time; the available set is a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Role {
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub client_name: String,
    pub is_personal_lock: bool,
}

/// An organization visible to the current role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Organization {
    pub id: i32,
    pub uuid: String,
    pub name: String,
}

/// A warehouse belonging to the current organization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Warehouse {
    pub id: i32,
    pub uuid: String,
    pub name: String,
}
