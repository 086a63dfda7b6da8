/// Database models and data access
///
/// One module per entity, following the cascade chain:
///
/// - `user`: accounts and short profile projections
/// - `board`: boards, membership, and annotated count queries
/// - `task`: tasks, reviewer sets, and membership validation
/// - `comment`: task-scoped comments

pub mod board;
pub mod comment;
pub mod task;
pub mod user;
