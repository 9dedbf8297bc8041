//! Core domain types
//!
//! This module contains the structures the platform reports back: job and
//! schedule statuses, raw descriptions, AutoML candidates, endpoints and log
//! records. Clients never treat these as authoritative; they are snapshots of
//! remote state.

pub mod candidate;
pub mod description;
pub mod endpoint;
pub mod job;
pub mod log;
pub mod schedule;
