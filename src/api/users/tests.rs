use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::core::security;
use crate::db::types::UserRole;
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn admin_creates_updates_and_deletes_user() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let admin = test_support::insert_user(ctx.state.db(), "admin01", UserRole::Admin).await;
    let token = test_support::bearer_token(admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users/create",
            Some(&token),
            Some(json!({
                "username": "new.student",
                "email": "new.student@example.com",
                "password": "long-enough"
            })),
        ))
        .await
        .expect("create user");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["role"], "student");
    assert_eq!(created["is_active"], true);
    assert_eq!(created["authored_courses"], json!([]));
    assert!(created.get("password").is_none());
    assert!(created.get("hashed_password").is_none());

    let user_id = created["id"].as_i64().expect("user id");
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/users/{user_id}"),
            Some(&token),
            Some(json!({ "role": "teacher", "is_active": false, "password": "another-secret" })),
        ))
        .await
        .expect("patch user");
    let status = response.status();
    let updated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["role"], "teacher");
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["username"], "new.student");

    let stored = repositories::users::find_by_id(ctx.state.db(), user_id)
        .await
        .expect("user query")
        .expect("user exists");
    assert!(security::verify_password("another-secret", &stored.hashed_password).expect("verify"));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/users/{user_id}/update"),
            Some(&token),
            Some(json!({ "username": "renamed" })),
        ))
        .await
        .expect("incomplete replace");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["errors"]["email"][0], "This field is required.");
    assert!(body["errors"].get("password").is_none());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/users/{user_id}/delete"),
            Some(&token),
            None,
        ))
        .await
        .expect("delete user");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/users/{user_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("get deleted user");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_endpoints_are_admin_only() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let teacher = test_support::insert_user(ctx.state.db(), "teacher01", UserRole::Teacher).await;
    let student = test_support::insert_user(ctx.state.db(), "student01", UserRole::Student).await;

    for user in [&teacher, &student] {
        let token = test_support::bearer_token(user.id, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/v1/users", Some(&token), None))
            .await
            .expect("list users");
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", user.username);
        let body = test_support::read_json(response).await;
        assert_eq!(body["detail"], "You do not have permission to perform this action.");
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/users", None, None))
        .await
        .expect("anonymous list");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_and_invalid_users_are_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let admin = test_support::insert_user(ctx.state.db(), "admin01", UserRole::Admin).await;
    test_support::insert_user(ctx.state.db(), "taken", UserRole::Student).await;
    let token = test_support::bearer_token(admin.id, ctx.state.settings());

    let cases = [
        (
            json!({ "username": "taken", "email": "fresh@example.com", "password": "long-enough" }),
            "username",
            "A user with that username already exists.",
        ),
        (
            json!({ "username": "fresh", "email": "taken@test.com", "password": "long-enough" }),
            "email",
            "user with this email already exists.",
        ),
        (
            json!({ "username": "fresh", "email": "fresh@example.com", "password": "short" }),
            "password",
            "Ensure this field has at least 8 characters.",
        ),
        (
            json!({ "username": "has space", "email": "fresh@example.com", "password": "long-enough" }),
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ),
        (
            json!({ "username": "fresh", "email": "not-an-email", "password": "long-enough" }),
            "email",
            "Enter a valid email address.",
        ),
        (
            json!({ "username": "fresh", "email": "fresh@example.com", "password": "long-enough", "role": "owner" }),
            "role",
            "\"owner\" is not a valid choice.",
        ),
        (json!({ "email": "fresh@example.com" }), "password", "This field is required."),
    ];

    for (payload, field, message) in cases {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/users",
                Some(&token),
                Some(payload),
            ))
            .await
            .expect("create user");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{field}");
        let body = test_support::read_json(response).await;
        assert_eq!(body["errors"][field][0], message, "response: {body}");
    }
}

#[tokio::test]
async fn list_filters_by_role_and_reports_relations() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let admin = test_support::insert_user(ctx.state.db(), "admin01", UserRole::Admin).await;
    let teacher = test_support::insert_user(ctx.state.db(), "teacher01", UserRole::Teacher).await;
    let student = test_support::insert_user(ctx.state.db(), "student01", UserRole::Student).await;
    let course = test_support::insert_course(ctx.state.db(), "Art", teacher.id).await;
    let module = test_support::insert_module(ctx.state.db(), course.id, teacher.id, 1, "Color").await;
    test_support::insert_enrollment(ctx.state.db(), student.id, module.id).await;
    let token = test_support::bearer_token(admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/users?role=teacher",
            Some(&token),
            None,
        ))
        .await
        .expect("list teachers");
    assert_eq!(response.status(), StatusCode::OK);
    let teachers = test_support::read_json(response).await;
    assert_eq!(teachers.as_array().expect("array").len(), 1);
    assert_eq!(teachers[0]["id"], teacher.id);
    assert_eq!(teachers[0]["authored_courses"], json!([course.id]));
    assert_eq!(teachers[0]["authored_modules"], json!([module.id]));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/users/{}", student.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get student");
    let fetched = test_support::read_json(response).await;
    assert_eq!(fetched["enrolled_modules"], json!([module.id]));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/users?role=janitor",
            Some(&token),
            None,
        ))
        .await
        .expect("unknown role filter");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test_support::read_json(response).await, json!([]));
}

#[tokio::test]
async fn deleting_teacher_cascades_and_removes_uploads() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let admin = test_support::insert_user(ctx.state.db(), "admin01", UserRole::Admin).await;
    let teacher = test_support::insert_user(ctx.state.db(), "teacher01", UserRole::Teacher).await;
    let course = test_support::insert_course(ctx.state.db(), "Music", teacher.id).await;
    let stored = ctx.state.storage().save_material("score.pdf", b"%PDF").await.expect("save file");
    sqlx::query("INSERT INTO materials (title, content, file_path, material_type, uploaded_by, uploaded_at) VALUES ('Score', 'Sheet music', $1, 'pdf', $2, NOW())")
        .bind(&stored.path)
        .bind(teacher.id)
        .execute(ctx.state.db())
        .await
        .expect("insert material");
    let token = test_support::bearer_token(admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/users/{}", teacher.id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete teacher");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(repositories::courses::find_by_id(ctx.state.db(), course.id)
        .await
        .expect("course query")
        .is_none());
    assert!(repositories::materials::list(ctx.state.db()).await.expect("materials").is_empty());
    assert!(matches!(
        ctx.state.storage().read(&stored.path).await,
        Err(crate::services::storage::StorageError::NotFound)
    ));
}
