mod common;

use axum::http::StatusCode;
use common::{body_json, unique_email, TestApp};
use serde_json::json;
use std::time::Duration;

/// The audit writer runs on a background task; give it a moment to drain.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn registration_and_login_are_audited() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();
    let email = admin["user"]["email"].as_str().unwrap();

    app.post_json(
        "/api/auth/login",
        json!({ "email": email, "password": "correct-horse-battery" }),
    )
    .await;
    settle().await;

    let body = body_json(app.get_authed("/api/audit-logs", admin_token).await).await;
    let actions: Vec<&str> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();

    assert!(actions.contains(&"team_created"));
    assert!(actions.contains(&"user_registered"));
    assert!(actions.contains(&"user_login"));
    assert!(body["total"].as_i64().unwrap() >= 3);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn audit_log_filters_by_action() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();
    settle().await;

    let body = body_json(
        app.get_authed("/api/audit-logs?action=user_registered", admin_token)
            .await,
    )
    .await;
    for entry in body["entries"].as_array().unwrap() {
        assert_eq!(entry["action"], "user_registered");
    }
    assert!(body["total"].as_i64().unwrap() >= 1);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn audit_log_pagination_limits_results() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();

    // Generate a few more entries.
    for _ in 0..3 {
        app.post_json_authed(
            "/api/team/invite",
            json!({ "email": unique_email("page") }),
            admin_token,
        )
        .await;
    }
    settle().await;

    let body = body_json(app.get_authed("/api/audit-logs?limit=2", admin_token).await).await;
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
    assert_eq!(body["limit"], 2);
    assert!(body["total"].as_i64().unwrap() > 2);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn audit_log_is_admin_only() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();

    let invite = body_json(
        app.post_json_authed(
            "/api/team/invite",
            json!({ "email": unique_email("aud") }),
            admin_token,
        )
        .await,
    )
    .await;
    let accept = body_json(
        app.post_json(
            "/api/team/accept-invite",
            json!({
                "token": invite["token"].as_str().unwrap(),
                "password": "member-password",
                "display_name": "Member",
            }),
        )
        .await,
    )
    .await;
    let member_token = accept["access_token"].as_str().unwrap();

    let denied = app.get_authed("/api/audit-logs", member_token).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn audit_log_is_scoped_to_the_callers_team() {
    let app = TestApp::spawn().await;
    let admin_a = app.register_admin().await;
    let admin_b = app.register_admin().await;
    settle().await;

    let token_a = admin_a["access_token"].as_str().unwrap();
    let team_b = admin_b["user"]["team_id"].as_str().unwrap();

    let body = body_json(app.get_authed("/api/audit-logs", token_a).await).await;
    for entry in body["entries"].as_array().unwrap() {
        assert_ne!(entry["team_id"], team_b);
    }
}
