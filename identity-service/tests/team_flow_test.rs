mod common;

use axum::http::StatusCode;
use common::{body_json, unique_email, TestApp};
use serde_json::json;

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn invite_and_accept_adds_a_member() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();
    let team_id = admin["user"]["team_id"].as_str().unwrap();

    let invite_email = unique_email("invitee");
    let invite = app
        .post_json_authed(
            "/api/team/invite",
            json!({ "email": invite_email }),
            admin_token,
        )
        .await;
    assert_eq!(invite.status(), StatusCode::CREATED);
    let invite_body = body_json(invite).await;
    assert_eq!(invite_body["role"], "member");
    let token = invite_body["token"].as_str().unwrap().to_string();

    let accept = app
        .post_json(
            "/api/team/accept-invite",
            json!({
                "token": token,
                "password": "invitee-password-1",
                "display_name": "Invitee",
            }),
        )
        .await;
    assert_eq!(accept.status(), StatusCode::CREATED);
    let accept_body = body_json(accept).await;
    assert_eq!(accept_body["user"]["email"], invite_email);
    assert_eq!(accept_body["user"]["role"], "member");
    assert_eq!(accept_body["user"]["team_id"], team_id);
    assert!(accept_body["access_token"].is_string());

    // The new member shows up in the roster.
    let members = body_json(app.get_authed("/api/team/members", admin_token).await).await;
    let emails: Vec<&str> = members["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["email"].as_str().unwrap())
        .collect();
    assert!(emails.contains(&invite_email.as_str()));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn invitation_token_is_single_use() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();

    let invite = body_json(
        app.post_json_authed(
            "/api/team/invite",
            json!({ "email": unique_email("once") }),
            admin_token,
        )
        .await,
    )
    .await;
    let token = invite["token"].as_str().unwrap().to_string();

    let first = app
        .post_json(
            "/api/team/accept-invite",
            json!({ "token": token, "password": "password-eight", "display_name": "A" }),
        )
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .post_json(
            "/api/team/accept-invite",
            json!({ "token": token, "password": "password-eight", "display_name": "B" }),
        )
        .await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn expired_invitation_cannot_be_accepted() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();

    let invite = body_json(
        app.post_json_authed(
            "/api/team/invite",
            json!({ "email": unique_email("late") }),
            admin_token,
        )
        .await,
    )
    .await;
    let invitation_id =
        uuid::Uuid::parse_str(invite["invitation_id"].as_str().unwrap()).unwrap();
    let token = invite["token"].as_str().unwrap().to_string();

    sqlx::query("UPDATE invitations SET expiry_utc = NOW() - INTERVAL '1 day' WHERE invitation_id = $1")
        .bind(invitation_id)
        .execute(app.state.db.pool())
        .await
        .unwrap();

    let response = app
        .post_json(
            "/api/team/accept-invite",
            json!({ "token": token, "password": "password-eight", "display_name": "Late" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn concurrent_accepts_redeem_exactly_once() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();

    let invite = body_json(
        app.post_json_authed(
            "/api/team/invite",
            json!({ "email": unique_email("racer") }),
            admin_token,
        )
        .await,
    )
    .await;
    let token = invite["token"].as_str().unwrap();

    let accept_body = json!({
        "token": token,
        "password": "racer-password-1",
        "display_name": "Racer",
    });
    let (first, second) = tokio::join!(
        app.post_json("/api/team/accept-invite", accept_body.clone()),
        app.post_json("/api/team/accept-invite", accept_body.clone()),
    );

    let statuses = [first.status(), second.status()];
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::CREATED)
            .count(),
        1,
        "exactly one accept should win, got {:?}",
        statuses
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::BAD_REQUEST)
            .count(),
        1,
        "the loser should see an invalid invitation, got {:?}",
        statuses
    );
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn failed_accept_leaves_the_invitation_redeemable() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();

    let invite_email = unique_email("race");
    let invite = body_json(
        app.post_json_authed(
            "/api/team/invite",
            json!({ "email": invite_email }),
            admin_token,
        )
        .await,
    )
    .await;
    let invitation_id =
        uuid::Uuid::parse_str(invite["invitation_id"].as_str().unwrap()).unwrap();

    // The invitee registers on their own before redeeming the invitation.
    let independent = app
        .post_json(
            "/api/auth/register",
            json!({
                "email": invite_email,
                "password": "their-own-password",
                "display_name": "Independent",
            }),
        )
        .await;
    assert_eq!(independent.status(), StatusCode::CREATED);

    let accept = app
        .post_json(
            "/api/team/accept-invite",
            json!({
                "token": invite["token"].as_str().unwrap(),
                "password": "password-eight",
                "display_name": "Race",
            }),
        )
        .await;
    assert_eq!(accept.status(), StatusCode::CONFLICT);

    // The claim was rolled back, not consumed.
    let state: String =
        sqlx::query_scalar("SELECT state_code FROM invitations WHERE invitation_id = $1")
            .bind(invitation_id)
            .fetch_one(app.state.db.pool())
            .await
            .unwrap();
    assert_eq!(state, "pending");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn unknown_invitation_token_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/api/team/accept-invite",
            json!({ "token": "bogus-token", "password": "password-eight", "display_name": "X" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn invited_manager_gets_the_manager_role() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();

    let invite = body_json(
        app.post_json_authed(
            "/api/team/invite",
            json!({ "email": unique_email("mgr"), "role": "manager" }),
            admin_token,
        )
        .await,
    )
    .await;
    assert_eq!(invite["role"], "manager");

    let accept = body_json(
        app.post_json(
            "/api/team/accept-invite",
            json!({
                "token": invite["token"].as_str().unwrap(),
                "password": "manager-password",
                "display_name": "Manager",
            }),
        )
        .await,
    )
    .await;
    assert_eq!(accept["user"]["role"], "manager");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn member_cannot_invite_but_manager_can() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();

    // Bring in a plain member and a manager.
    let member_token = accept_invited(&app, admin_token, "member").await;
    let manager_token = accept_invited(&app, admin_token, "manager").await;

    let denied = app
        .post_json_authed(
            "/api/team/invite",
            json!({ "email": unique_email("nope") }),
            &member_token,
        )
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let allowed = app
        .post_json_authed(
            "/api/team/invite",
            json!({ "email": unique_email("ok") }),
            &manager_token,
        )
        .await;
    assert_eq!(allowed.status(), StatusCode::CREATED);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn only_admin_can_change_roles() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();

    let manager_token = accept_invited(&app, admin_token, "manager").await;
    let member_token = accept_invited(&app, admin_token, "member").await;

    let member_me = body_json(app.get_authed("/api/auth/me", &member_token).await).await;
    let member_id = member_me["user"]["user_id"].as_str().unwrap();

    // Manager holds invite rights but not role administration.
    let denied = app
        .put_json_authed(
            "/api/team/member/role",
            json!({ "user_id": member_id, "role": "manager" }),
            &manager_token,
        )
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let allowed = app
        .put_json_authed(
            "/api/team/member/role",
            json!({ "user_id": member_id, "role": "manager" }),
            admin_token,
        )
        .await;
    assert_eq!(allowed.status(), StatusCode::OK);
    let updated = body_json(allowed).await;
    assert_eq!(updated["role"], "manager");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn role_change_is_scoped_to_the_admins_team() {
    let app = TestApp::spawn().await;
    let admin_a = app.register_admin().await;
    let admin_b = app.register_admin().await;
    let token_a = admin_a["access_token"].as_str().unwrap();
    let outsider_id = admin_b["user"]["user_id"].as_str().unwrap();

    let response = app
        .put_json_authed(
            "/api/team/member/role",
            json!({ "user_id": outsider_id, "role": "member" }),
            token_a,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn inviting_an_existing_user_conflicts() {
    let app = TestApp::spawn().await;
    let admin = app.register_admin().await;
    let admin_token = admin["access_token"].as_str().unwrap();
    let existing_email = admin["user"]["email"].as_str().unwrap();

    let response = app
        .post_json_authed(
            "/api/team/invite",
            json!({ "email": existing_email }),
            admin_token,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// Invite a fresh email with the given role and accept it; returns the new
/// member's access token.
async fn accept_invited(app: &TestApp, admin_token: &str, role: &str) -> String {
    let invite = body_json(
        app.post_json_authed(
            "/api/team/invite",
            json!({ "email": unique_email(role), "role": role }),
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
                "password": "invited-password",
                "display_name": "Invited",
            }),
        )
        .await,
    )
    .await;

    accept["access_token"].as_str().unwrap().to_string()
}
