/// Integration tests for the KanMind API
///
/// These tests verify the full system end-to-end against a real Postgres:
/// - Registration and login flows
/// - Board CRUD with count annotations and membership replacement
/// - Task policies (assignee/reviewer access, membership validation)
/// - Comment threads and author-only deletion
/// - The existence/permission split (404 vs 403)
///
/// All tests require DATABASE_URL and JWT_SECRET to point at a test
/// database and are `#[ignore]`d so `cargo test` passes without one.
/// Run with: `cargo test -p kanmind-api -- --ignored`

mod common;

use axum::http::StatusCode;
use common::TestContext;
use kanmind_shared::models::comment::Comment;
use kanmind_shared::models::task::Task;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_register_and_login() {
    let ctx = TestContext::new().await.unwrap();
    let email = format!("register-{}@example.com", Uuid::new_v4());

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "fullname": "New User",
                "email": email,
                "password": "SecureP@ss123",
                "repeated_password": "SecureP@ss123"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["email"], email);

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "SecureP@ss123" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    assert!(body["access_token"].is_string());

    // Wrong password and unknown email produce the same message
    let (status, wrong_pw) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "wrong_password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "whatever1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw["message"], unknown["message"]);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_register_rejects_mismatched_passwords() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "fullname": "New User",
                "email": format!("mismatch-{}@example.com", Uuid::new_v4()),
                "password": "SecureP@ss123",
                "repeated_password": "SomethingElse1"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "repeated_password");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_authentication_required() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.request("GET", "/v1/boards", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_board_create_owner_not_auto_joined() {
    let ctx = TestContext::new().await.unwrap();

    // Owner creates a board naming two members; the owner is not one of them
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/boards",
            Some(&ctx.owner),
            Some(json!({
                "title": "Shared Board",
                "members": [ctx.member.id, ctx.outsider.id]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    assert_eq!(body["member_count"], 2);
    assert_eq!(body["ticket_count"], 0);
    assert_eq!(body["tasks_to_do_count"], 0);
    assert_eq!(body["tasks_high_prio_count"], 0);

    let board_id = body["id"].as_str().unwrap().to_string();

    // Visible to the owner and both members
    for user in [&ctx.owner, &ctx.member, &ctx.outsider] {
        let (status, boards) = ctx.request("GET", "/v1/boards", Some(user), None).await;
        assert_eq!(status, StatusCode::OK);
        let found = boards
            .as_array()
            .unwrap()
            .iter()
            .any(|b| b["id"] == board_id.as_str());
        assert!(found, "board not visible to {}", user.fullname);
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_board_create_rejects_unknown_member() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/boards",
            Some(&ctx.owner),
            Some(json!({ "title": "Bad Board", "members": [Uuid::new_v4()] })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "members");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_board_counts_are_exact() {
    let ctx = TestContext::new().await.unwrap();

    common::create_test_task(&ctx, "t1", ctx.member.id, &[]).await.unwrap();
    common::create_test_task(&ctx, "t2", ctx.member.id, &[ctx.owner.id])
        .await
        .unwrap();

    let (status, boards) = ctx.request("GET", "/v1/boards", Some(&ctx.owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let board = boards
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["id"] == ctx.board.id.to_string())
        .expect("fixture board missing")
        .clone();

    assert_eq!(board["member_count"], 1);
    assert_eq!(board["ticket_count"], 2);
    assert_eq!(board["tasks_to_do_count"], 2);
    assert_eq!(board["tasks_high_prio_count"], 0);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_board_access_and_delete_policies() {
    let ctx = TestContext::new().await.unwrap();
    let uri = format!("/v1/boards/{}", ctx.board.id);

    // Outsider cannot see the board
    let (status, _) = ctx.request("GET", &uri, Some(&ctx.outsider), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Member can see it but cannot delete it
    let (status, _) = ctx.request("GET", &uri, Some(&ctx.member), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.request("DELETE", &uri, Some(&ctx.member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nonexistent board is 404, not 403
    let (status, _) = ctx
        .request(
            "GET",
            &format!("/v1/boards/{}", Uuid::new_v4()),
            Some(&ctx.outsider),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Owner deletes; tasks and comments cascade
    let task = common::create_test_task(&ctx, "doomed", ctx.member.id, &[])
        .await
        .unwrap();
    Comment::create(&ctx.db, task.id, ctx.member.id, "soon gone")
        .await
        .unwrap();

    let (status, _) = ctx.request("DELETE", &uri, Some(&ctx.owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(Task::find_by_id(&ctx.db, task.id).await.unwrap().is_none());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_board_update_replaces_members() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .request(
            "PATCH",
            &format!("/v1/boards/{}", ctx.board.id),
            Some(&ctx.owner),
            Some(json!({
                "title": "Renamed Board",
                "members": [ctx.outsider.id]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "update failed: {}", body);
    assert_eq!(body["title"], "Renamed Board");
    assert_eq!(body["owner_data"]["id"], ctx.owner.id.to_string());

    let members = body["members_data"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["id"], ctx.outsider.id.to_string());

    // The replaced member lost access
    let (status, _) = ctx
        .request(
            "GET",
            &format!("/v1/boards/{}", ctx.board.id),
            Some(&ctx.member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_task_create_validates_membership() {
    let ctx = TestContext::new().await.unwrap();

    // Assignee must be on the board
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&ctx.owner),
            Some(json!({
                "board": ctx.board.id,
                "title": "Bad assignee",
                "assignee_id": ctx.outsider.id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "assignee_id");

    // Reviewers too
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&ctx.owner),
            Some(json!({
                "board": ctx.board.id,
                "title": "Bad reviewer",
                "assignee_id": ctx.member.id,
                "reviewer_ids": [ctx.outsider.id]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "reviewer_ids");

    // Outsider cannot create tasks on the board at all
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&ctx.outsider),
            Some(json!({
                "board": ctx.board.id,
                "title": "Denied",
                "assignee_id": ctx.member.id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nonexistent board is 404
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&ctx.owner),
            Some(json!({
                "board": Uuid::new_v4(),
                "title": "Nowhere",
                "assignee_id": ctx.member.id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Valid create, reviewers as a comma-separated string
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&ctx.owner),
            Some(json!({
                "board": ctx.board.id,
                "title": "Ship it",
                "description": "Final review pass",
                "status": "in-progress",
                "priority": "high",
                "assignee_id": ctx.member.id,
                "reviewer_ids": ctx.owner.id.to_string(),
                "due_date": "2026-09-15"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    assert_eq!(body["status"], "in-progress");
    assert_eq!(body["priority"], "high");
    assert_eq!(body["assignee"]["id"], ctx.member.id.to_string());
    assert_eq!(body["reviewers"][0]["id"], ctx.owner.id.to_string());
    assert_eq!(body["comments_count"], 0);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_task_access_is_assignee_or_reviewer_only() {
    let ctx = TestContext::new().await.unwrap();

    let task = common::create_test_task(&ctx, "restricted", ctx.member.id, &[])
        .await
        .unwrap();
    let uri = format!("/v1/tasks/{}", task.id);

    // Assignee can read
    let (status, _) = ctx.request("GET", &uri, Some(&ctx.member), None).await;
    assert_eq!(status, StatusCode::OK);

    // The board owner is neither assignee nor reviewer: denied
    let (status, _) = ctx.request("GET", &uri, Some(&ctx.owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .request(
            "PATCH",
            &uri,
            Some(&ctx.owner),
            Some(json!({ "status": "done" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // But the owner may delete (assignee-or-owner policy)
    let (status, _) = ctx.request("DELETE", &uri, Some(&ctx.owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_task_update_validates_new_assignee() {
    let ctx = TestContext::new().await.unwrap();

    let task = common::create_test_task(&ctx, "reassign", ctx.member.id, &[])
        .await
        .unwrap();

    let (status, body) = ctx
        .request(
            "PATCH",
            &format!("/v1/tasks/{}", task.id),
            Some(&ctx.member),
            Some(json!({ "assignee_id": ctx.outsider.id })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "assignee_id");

    // Clearing the due date with an explicit null works
    let (status, body) = ctx
        .request(
            "PATCH",
            &format!("/v1/tasks/{}", task.id),
            Some(&ctx.member),
            Some(json!({ "due_date": null, "status": "review" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "update failed: {}", body);
    assert_eq!(body["status"], "review");
    assert!(body["due_date"].is_null());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_assigned_to_me_and_reviewing() {
    let ctx = TestContext::new().await.unwrap();

    common::create_test_task(&ctx, "mine", ctx.member.id, &[ctx.owner.id])
        .await
        .unwrap();

    let (status, body) = ctx
        .request("GET", "/v1/tasks/assigned-to-me", Some(&ctx.member), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "mine");

    let (status, body) = ctx
        .request("GET", "/v1/tasks/reviewing", Some(&ctx.owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = ctx
        .request("GET", "/v1/tasks/reviewing", Some(&ctx.outsider), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_comment_author_is_always_the_actor() {
    let ctx = TestContext::new().await.unwrap();

    let task = common::create_test_task(&ctx, "discussed", ctx.member.id, &[])
        .await
        .unwrap();
    let uri = format!("/v1/tasks/{}/comments", task.id);

    let (status, body) = ctx
        .request(
            "POST",
            &uri,
            Some(&ctx.member),
            // An attempted author override is simply not part of the schema
            Some(json!({ "content": "First!", "author": "Mallory" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    assert_eq!(body["author"], ctx.member.fullname);

    // Outsider can neither read nor write the thread
    let (status, _) = ctx.request("GET", &uri, Some(&ctx.outsider), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .request(
            "POST",
            &uri,
            Some(&ctx.outsider),
            Some(json!({ "content": "let me in" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Board owner can read; list is newest first
    ctx.request(
        "POST",
        &uri,
        Some(&ctx.owner),
        Some(json!({ "content": "Second" })),
    )
    .await;

    let (status, body) = ctx.request("GET", &uri, Some(&ctx.owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let comments = body.as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["content"], "Second");
    assert_eq!(comments[1]["content"], "First!");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_comment_delete_author_only() {
    let ctx = TestContext::new().await.unwrap();

    let task = common::create_test_task(&ctx, "thread", ctx.member.id, &[])
        .await
        .unwrap();
    let comment = Comment::create(&ctx.db, task.id, ctx.member.id, "mine to delete")
        .await
        .unwrap();
    let uri = format!("/v1/tasks/{}/comments/{}", task.id, comment.id);

    // The board owner alone cannot delete someone else's comment
    let (status, _) = ctx.request("DELETE", &uri, Some(&ctx.owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A comment id under the wrong task reads as 404
    let other_task = common::create_test_task(&ctx, "other", ctx.member.id, &[])
        .await
        .unwrap();
    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/tasks/{}/comments/{}", other_task.id, comment.id),
            Some(&ctx.member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The author can
    let (status, _) = ctx.request("DELETE", &uri, Some(&ctx.member), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_email_check() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .request(
            "GET",
            &format!("/v1/email-check?email={}", ctx.member.email),
            Some(&ctx.owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], ctx.member.id.to_string());
    assert_eq!(body["fullname"], ctx.member.fullname);

    let (status, _) = ctx
        .request(
            "GET",
            "/v1/email-check?email=ghost@example.com",
            Some(&ctx.owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .request(
            "GET",
            "/v1/email-check?email=not-an-email",
            Some(&ctx.owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_health_check() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");

    ctx.cleanup().await.unwrap();
}
