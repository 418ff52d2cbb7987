//! Infrastructure layer: collaborator seams and their concrete backends

pub mod api;
pub mod credentials;
pub mod dispatch;
pub mod router;
