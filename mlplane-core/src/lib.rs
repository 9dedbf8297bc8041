//! mlplane Core
//!
//! Wire types shared by the mlplane client crates.
//!
//! This crate contains:
//! - Domain types: job, schedule, endpoint and log records as the platform reports them
//! - DTOs: request payloads sent to the control plane, serialized with the platform's keys

pub mod domain;
pub mod dto;
