//! Domain layer: session state and reference data

pub mod reference;
pub mod session;
