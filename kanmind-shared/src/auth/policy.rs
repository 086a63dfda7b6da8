/// Authorization policy engine
///
/// Every protected endpoint is guarded by a `Policy`: a list of predicates
/// combined with AND or OR, evaluated against the acting user and a snapshot
/// of the target resource's access-relevant relations. Evaluation is a pure
/// function, so the rules are unit-testable without a database; the models
/// layer loads the snapshots.
///
/// # Permission Model
///
/// - Board retrieve/update: owner OR member
/// - Board delete: owner only
/// - Task create: owner-or-member of the target board
/// - Task retrieve/update: assignee OR reviewer
/// - Task delete: assignee OR board owner
/// - Comment list/create: owner-or-member of the task's board
/// - Comment delete: comment author only
///
/// # Example
///
/// ```
/// use kanmind_shared::auth::policy::{BoardScope, Policy, Predicate};
/// use uuid::Uuid;
///
/// let owner = Uuid::new_v4();
/// let member = Uuid::new_v4();
/// let scope = BoardScope {
///     board_id: Uuid::new_v4(),
///     owner_id: owner,
///     member_ids: vec![member],
/// };
///
/// let policy = Policy::any([Predicate::BoardOwner, Predicate::BoardMember]);
/// assert!(policy.evaluate(member, &scope.clone().into()));
/// assert!(!policy.evaluate(Uuid::new_v4(), &scope.into()));
/// ```

use uuid::Uuid;

/// Error type for policy evaluation
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Actor is authenticated but the policy denied the request
    #[error("Not authorized to access this resource")]
    Denied,

    /// Database error while loading the resource scope
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// A single authorization predicate over (actor, resource)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Actor is the owner of the board
    BoardOwner,

    /// Actor is the board owner or in the board's member set
    BoardMember,

    /// Actor is the task's assignee
    TaskAssignee,

    /// Actor is one of the task's reviewers
    TaskReviewer,

    /// Actor is the comment's author
    CommentAuthor,
}

/// How a policy combines its predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Every predicate must hold
    All,

    /// At least one predicate must hold
    Any,
}

/// Access-relevant snapshot of a board
#[derive(Debug, Clone)]
pub struct BoardScope {
    /// Board ID
    pub board_id: Uuid,

    /// Owner of the board
    pub owner_id: Uuid,

    /// Explicit members (owner not implicitly included)
    pub member_ids: Vec<Uuid>,
}

impl BoardScope {
    /// True if the user is the owner or an explicit member
    pub fn is_owner_or_member(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.member_ids.contains(&user_id)
    }
}

/// Access-relevant snapshot of a task, including its board
#[derive(Debug, Clone)]
pub struct TaskScope {
    /// Task ID
    pub task_id: Uuid,

    /// The board the task belongs to
    pub board: BoardScope,

    /// The single assignee
    pub assignee_id: Uuid,

    /// Zero or more reviewers
    pub reviewer_ids: Vec<Uuid>,
}

/// Access-relevant snapshot of a comment, including its task and board
#[derive(Debug, Clone)]
pub struct CommentScope {
    /// Comment ID
    pub comment_id: Uuid,

    /// The comment's author
    pub author_id: Uuid,

    /// The task the comment belongs to
    pub task: TaskScope,
}

/// The resource snapshot a policy is evaluated against
#[derive(Debug, Clone)]
pub enum AccessScope {
    Board(BoardScope),
    Task(TaskScope),
    Comment(CommentScope),
}

impl From<BoardScope> for AccessScope {
    fn from(scope: BoardScope) -> Self {
        AccessScope::Board(scope)
    }
}

impl From<TaskScope> for AccessScope {
    fn from(scope: TaskScope) -> Self {
        AccessScope::Task(scope)
    }
}

impl From<CommentScope> for AccessScope {
    fn from(scope: CommentScope) -> Self {
        AccessScope::Comment(scope)
    }
}

impl AccessScope {
    /// The board snapshot reachable from any scope
    fn board(&self) -> &BoardScope {
        match self {
            AccessScope::Board(b) => b,
            AccessScope::Task(t) => &t.board,
            AccessScope::Comment(c) => &c.task.board,
        }
    }

    /// The task snapshot, if this scope has one
    fn task(&self) -> Option<&TaskScope> {
        match self {
            AccessScope::Board(_) => None,
            AccessScope::Task(t) => Some(t),
            AccessScope::Comment(c) => Some(&c.task),
        }
    }
}

impl Predicate {
    /// Evaluates this predicate for an actor against a resource snapshot
    ///
    /// Predicates that do not apply to the scope (e.g. `TaskAssignee` on a
    /// bare board) evaluate to false rather than panicking; policies are
    /// wired per endpoint so this only matters for misconfigured tests.
    pub fn holds(&self, actor_id: Uuid, scope: &AccessScope) -> bool {
        match self {
            Predicate::BoardOwner => scope.board().owner_id == actor_id,
            Predicate::BoardMember => scope.board().is_owner_or_member(actor_id),
            Predicate::TaskAssignee => scope
                .task()
                .is_some_and(|t| t.assignee_id == actor_id),
            Predicate::TaskReviewer => scope
                .task()
                .is_some_and(|t| t.reviewer_ids.contains(&actor_id)),
            Predicate::CommentAuthor => match scope {
                AccessScope::Comment(c) => c.author_id == actor_id,
                _ => false,
            },
        }
    }
}

/// A tagged authorization policy: predicates plus a combinator
#[derive(Debug, Clone)]
pub struct Policy {
    predicates: Vec<Predicate>,
    combinator: Combinator,
}

impl Policy {
    /// Policy that passes when every predicate holds
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            predicates: predicates.into_iter().collect(),
            combinator: Combinator::All,
        }
    }

    /// Policy that passes when at least one predicate holds
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            predicates: predicates.into_iter().collect(),
            combinator: Combinator::Any,
        }
    }

    /// Evaluates the policy for an actor against a resource snapshot
    ///
    /// An empty `All` policy allows and an empty `Any` policy denies, per
    /// the usual quantifier semantics.
    pub fn evaluate(&self, actor_id: Uuid, scope: &AccessScope) -> bool {
        match self.combinator {
            Combinator::All => self.predicates.iter().all(|p| p.holds(actor_id, scope)),
            Combinator::Any => self.predicates.iter().any(|p| p.holds(actor_id, scope)),
        }
    }

    /// Evaluates the policy, mapping denial to `PolicyError::Denied`
    pub fn check(&self, actor_id: Uuid, scope: &AccessScope) -> Result<(), PolicyError> {
        if self.evaluate(actor_id, scope) {
            Ok(())
        } else {
            Err(PolicyError::Denied)
        }
    }
}

/// Board retrieve/update: owner or member
pub fn board_access() -> Policy {
    Policy::any([Predicate::BoardOwner, Predicate::BoardMember])
}

/// Board delete: owner only
pub fn board_delete() -> Policy {
    Policy::all([Predicate::BoardOwner])
}

/// Task create (against the target board) and comment list/create (against
/// the task's board): owner-or-member
pub fn board_contribute() -> Policy {
    Policy::any([Predicate::BoardMember])
}

/// Task retrieve/update: assignee or reviewer
pub fn task_access() -> Policy {
    Policy::any([Predicate::TaskAssignee, Predicate::TaskReviewer])
}

/// Task delete: assignee or board owner
pub fn task_delete() -> Policy {
    Policy::any([Predicate::TaskAssignee, Predicate::BoardOwner])
}

/// Comment delete: author only, no board-owner override
pub fn comment_delete() -> Policy {
    Policy::all([Predicate::CommentAuthor])
}
