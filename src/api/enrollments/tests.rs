use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support;

#[tokio::test]
async fn student_enrolls_as_self_with_defaults() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let teacher = test_support::insert_user(ctx.state.db(), "teacher01", UserRole::Teacher).await;
    let student = test_support::insert_user(ctx.state.db(), "student01", UserRole::Student).await;
    let other = test_support::insert_user(ctx.state.db(), "student02", UserRole::Student).await;
    let course = test_support::insert_course(ctx.state.db(), "Biology", teacher.id).await;
    let module = test_support::insert_module(ctx.state.db(), course.id, teacher.id, 1, "Cells").await;
    let token = test_support::bearer_token(student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/enrollments/create",
            Some(&token),
            Some(json!({ "module": module.id, "student": other.id })),
        ))
        .await
        .expect("create enrollment");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["student"], student.id);
    assert_eq!(created["module"], module.id);
    assert_eq!(created["progress"], 0.0);
    assert_eq!(created["status"], "enrolled");

    let enrollment_id = created["id"].as_i64().expect("enrollment id");
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/enrollments/{enrollment_id}/update"),
            Some(&token),
            Some(json!({ "progress": 100.0, "status": "completed" })),
        ))
        .await
        .expect("complete enrollment");
    assert_eq!(response.status(), StatusCode::OK);
    let updated = test_support::read_json(response).await;
    assert_eq!(updated["progress"], 100.0);
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["enrolled_at"], created["enrolled_at"]);
}

#[tokio::test]
async fn enrollments_are_student_only() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let teacher = test_support::insert_user(ctx.state.db(), "teacher01", UserRole::Teacher).await;
    let admin = test_support::insert_user(ctx.state.db(), "admin01", UserRole::Admin).await;

    for user in [&teacher, &admin] {
        let token = test_support::bearer_token(user.id, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/enrollments",
                Some(&token),
                None,
            ))
            .await
            .expect("list enrollments");
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", user.username);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/enrollments", None, None))
        .await
        .expect("anonymous list");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn other_students_enrollments_are_not_found() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let teacher = test_support::insert_user(ctx.state.db(), "teacher01", UserRole::Teacher).await;
    let owner = test_support::insert_user(ctx.state.db(), "student01", UserRole::Student).await;
    let intruder = test_support::insert_user(ctx.state.db(), "student02", UserRole::Student).await;
    let course = test_support::insert_course(ctx.state.db(), "History", teacher.id).await;
    let module = test_support::insert_module(ctx.state.db(), course.id, teacher.id, 1, "Rome").await;
    let enrollment = test_support::insert_enrollment(ctx.state.db(), owner.id, module.id).await;
    let token = test_support::bearer_token(intruder.id, ctx.state.settings());
    let uri = format!("/api/v1/enrollments/{}", enrollment.id);

    for (method, body) in [
        (Method::GET, None),
        (Method::PATCH, Some(json!({ "progress": 50.0 }))),
        (Method::DELETE, None),
    ] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(method.clone(), &uri, Some(&token), body))
            .await
            .expect("foreign enrollment");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method}");
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/enrollments",
            Some(&token),
            None,
        ))
        .await
        .expect("intruder list");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed, json!([]));

    let owner_token = test_support::bearer_token(owner.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &uri, Some(&owner_token), None))
        .await
        .expect("owner get");
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = test_support::read_json(response).await;
    assert_eq!(fetched["progress"], 0.0);
}

#[tokio::test]
async fn enrollment_fields_are_validated() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let teacher = test_support::insert_user(ctx.state.db(), "teacher01", UserRole::Teacher).await;
    let student = test_support::insert_user(ctx.state.db(), "student01", UserRole::Student).await;
    let course = test_support::insert_course(ctx.state.db(), "Physics", teacher.id).await;
    let module = test_support::insert_module(ctx.state.db(), course.id, teacher.id, 1, "Waves").await;
    let token = test_support::bearer_token(student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/enrollments",
            Some(&token),
            Some(json!({ "module": 9999, "progress": 100.5, "status": "dropped" })),
        ))
        .await
        .expect("invalid enrollment");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["errors"]["module"][0], "Invalid pk \"9999\" - object does not exist.");
    assert_eq!(body["errors"]["progress"][0], "Ensure this value is between 0.0 and 100.0.");
    assert_eq!(body["errors"]["status"][0], "\"dropped\" is not a valid choice.");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/enrollments",
            Some(&token),
            Some(json!({ "progress": 10.0 })),
        ))
        .await
        .expect("missing module");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["errors"]["module"][0], "This field is required.");

    for progress in [0.0, 100.0] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/enrollments",
                Some(&token),
                Some(json!({ "module": module.id, "progress": progress, "status": "in_progress" })),
            ))
            .await
            .expect("boundary progress");
        assert_eq!(response.status(), StatusCode::CREATED, "{progress}");
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/enrollments",
            Some(&token),
            Some(json!({ "module": module.id, "progress": -0.1 })),
        ))
        .await
        .expect("negative progress");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
