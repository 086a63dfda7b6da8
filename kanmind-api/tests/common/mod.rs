/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - Test database setup and cleanup
/// - Test user and board fixtures
/// - JWT token generation per actor
/// - Request helpers against the in-process router

use axum::body::Body;
use axum::http::{Request, StatusCode};
use kanmind_api::app::{build_router, AppState};
use kanmind_api::config::Config;
use kanmind_shared::auth::jwt::{create_token, Claims, TokenType};
use kanmind_shared::models::board::Board;
use kanmind_shared::models::task::{CreateTask, Task, TaskPriority, TaskStatus};
use kanmind_shared::models::user::{CreateUser, User};
use sqlx::PgPool;
use tower::Service as _;
use uuid::Uuid;

/// Test context with three actors and a board
///
/// The fixture encodes the access matrix the permission tests need:
/// `owner` owns `board`, `member` is its only explicit member, and
/// `outsider` has no relation to it.
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    pub owner: User,
    pub member: User,
    pub outsider: User,
    pub board: Board,
}

impl TestContext {
    /// Creates a new test context with fresh fixtures
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Run migrations (path relative to Cargo.toml, not this file)
        sqlx::migrate!("../migrations").run(&db).await?;

        let owner = create_test_user(&db, "owner").await?;
        let member = create_test_user(&db, "member").await?;
        let outsider = create_test_user(&db, "outsider").await?;

        let mut tx = db.begin().await?;
        let board = Board::create(&mut tx, owner.id, "Test Board").await?;
        Board::replace_members(&mut tx, board.id, &[member.id]).await?;
        tx.commit().await?;

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            owner,
            member,
            outsider,
            board,
        })
    }

    /// Generates an access token for the given user
    pub fn token_for(&self, user: &User) -> String {
        let claims = Claims::new(user.id, TokenType::Access);
        create_token(&claims, &self.config.jwt.secret).expect("Token creation should succeed")
    }

    /// Returns an authorization header value for the given user
    pub fn auth_header(&self, user: &User) -> String {
        format!("Bearer {}", self.token_for(user))
    }

    /// Sends a JSON request as the given user, returning status and body
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        as_user: Option<&User>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(user) = as_user {
            builder = builder.header("authorization", self.auth_header(user));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        (status, json)
    }

    /// Cleans up test data
    ///
    /// Deleting the users cascades the board, its tasks, and comments.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        User::delete(&self.db, self.owner.id).await?;
        User::delete(&self.db, self.member.id).await?;
        User::delete(&self.db, self.outsider.id).await?;
        Ok(())
    }
}

/// Creates a user with a unique email
pub async fn create_test_user(db: &PgPool, label: &str) -> anyhow::Result<User> {
    let user = User::create(
        db,
        CreateUser {
            email: format!("{}-{}@example.com", label, Uuid::new_v4()),
            password_hash: "test_hash".to_string(), // Login endpoints are tested separately
            fullname: format!("Test {}", label),
        },
    )
    .await?;

    Ok(user)
}

/// Creates a task on the context board with the given assignee and reviewers
pub async fn create_test_task(
    ctx: &TestContext,
    title: &str,
    assignee_id: Uuid,
    reviewer_ids: &[Uuid],
) -> anyhow::Result<Task> {
    let mut tx = ctx.db.begin().await?;

    let task = Task::create(
        &mut tx,
        CreateTask {
            board_id: ctx.board.id,
            title: title.to_string(),
            description: String::new(),
            status: TaskStatus::ToDo,
            priority: TaskPriority::Medium,
            assignee_id,
            due_date: None,
        },
    )
    .await?;

    Task::replace_reviewers(&mut tx, task.id, reviewer_ids).await?;

    tx.commit().await?;

    Ok(task)
}
