//! Data Transfer Objects for the control plane
//!
//! Request payloads sent to the platform. Field names are serialized with the
//! platform's PascalCase keys and optional fields are omitted entirely when
//! absent, so the JSON produced here is the exact wire contract.

pub mod automl;
pub mod common;
pub mod endpoint;
pub mod monitoring;
pub mod processing;
