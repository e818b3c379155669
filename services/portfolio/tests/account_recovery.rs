//! Login, logout and forgotten-credential flows

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{PASSWORD, TestApp, body_json, link_path, session_cookie};

#[tokio::test]
async fn login_redirects_by_role_and_logout_drops_identity() {
    let app = TestApp::new();
    app.create_user("member", false).await;

    let response = app
        .post_form("/login", None, &[("username", "member"), ("password", PASSWORD)])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    assert_eq!(body_json(response).await["redirect"], "/dashboard");

    assert_eq!(app.get("/dashboard", Some(&cookie)).await.status(), StatusCode::OK);

    let response = app.post_form("/logout", Some(&cookie), &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.get("/dashboard", Some(&cookie)).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn repeated_failed_logins_are_throttled() {
    let app = TestApp::new();
    app.create_user("member", false).await;

    for _ in 0..5 {
        let response = app
            .post_form("/login", None, &[("username", "member"), ("password", "wrong")])
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .post_form("/login", None, &[("username", "member"), ("password", PASSWORD)])
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn forgot_username_answers_uniformly() {
    let app = TestApp::new();
    app.create_user("member", false).await;

    let known = body_json(
        app.post_form("/forgot-username", None, &[("email", "member@example.com")])
            .await,
    )
    .await;
    let unknown = body_json(
        app.post_form("/forgot-username", None, &[("email", "ghost@example.com")])
            .await,
    )
    .await;

    assert_eq!(known["message"], unknown["message"]);
    assert_eq!(app.outbox.messages().len(), 1);
    assert!(
        app.outbox
            .last_to("member@example.com")
            .unwrap()
            .body
            .contains("member")
    );
}

#[tokio::test]
async fn password_reset_link_sets_a_new_password() {
    let app = TestApp::new();
    app.create_user("member", false).await;

    let response = app
        .post_form("/forgot-password", None, &[("email", "member@example.com")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let mail = app.outbox.last_to("member@example.com").unwrap();
    let path = link_path(&mail.body, "/reset-password/");

    let check = body_json(app.get(&path, None).await).await;
    assert_eq!(check["username"], "member");

    let response = app
        .post_form(
            &path,
            None,
            &[("password", "abc"), ("confirm_password", "abc")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_form(
            &path,
            None,
            &[("password", "newpass1"), ("confirm_password", "newpass1")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_form("/login", None, &[("username", "member"), ("password", "newpass1")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reset_link_expires_after_an_hour() {
    let app = TestApp::new();
    app.create_user("member", false).await;

    app.post_form("/forgot-password", None, &[("email", "member@example.com")])
        .await;
    let mail = app.outbox.last_to("member@example.com").unwrap();
    let path = link_path(&mail.body, "/reset-password/");

    app.clock.advance(Duration::minutes(61));

    let response = app.get(&path, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "The link has expired. Please start again."
    );
}
