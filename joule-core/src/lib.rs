//! Joule Core
//!
//! Core types and abstractions for the Joule aggregation coordinator.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, ResultRow, OutboundMessage, etc.)
//! - DTOs: Data transfer objects for the compute-engine API and the HTTP surface

pub mod domain;
pub mod dto;
