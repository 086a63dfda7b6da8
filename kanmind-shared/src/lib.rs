//! # KanMind Shared Library
//!
//! This crate contains shared types, utilities, and business logic used by
//! the KanMind API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data access (users, boards, tasks, comments)
//! - `auth`: Authentication (JWT, passwords) and the authorization policy engine
//! - `db`: Connection pool and migration helpers

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the KanMind shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
