/// Authentication and authorization
///
/// - `jwt`: access/refresh token creation and validation
/// - `password`: Argon2id password hashing and strength checks
/// - `middleware`: axum middleware resolving the acting user from a bearer token
/// - `policy`: tagged-policy authorization engine evaluated per (actor, resource)

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod policy;
