/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh)
/// - `users`: Profile lookup (email check)
/// - `boards`: Board CRUD with membership and count annotations
/// - `tasks`: Task CRUD, assigned-to-me / reviewing lists
/// - `comments`: Comment threads under tasks

pub mod auth;
pub mod boards;
pub mod comments;
pub mod health;
pub mod tasks;
pub mod users;
