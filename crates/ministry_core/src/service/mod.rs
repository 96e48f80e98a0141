//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI and HTTP-facing layers decoupled from storage details.

pub mod hierarchy_service;
pub mod membership_resolver;
pub mod ministry_service;
