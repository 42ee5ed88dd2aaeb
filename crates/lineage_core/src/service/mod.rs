//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate record store calls into use-case level APIs.
//! - Keep callers decoupled from storage details.

pub mod lineage_service;
