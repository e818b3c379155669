//! End-to-end tests of the email-verified registration flow

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{TestApp, body_json, link_path, session_cookie};
use portfolio::repositories::CredentialStore;

const FORM: &[(&str, &str)] = &[
    ("username", "alice"),
    ("password", "pw123456"),
    ("email", "alice@example.com"),
    ("college_name", "MIT"),
    ("college_year", "2"),
];

/// Submit the registration form and return the session cookie
async fn submit(app: &TestApp) -> String {
    let response = app.post_form("/register", None, FORM).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("registration starts a session");

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["email_sent"], true);
    assert_eq!(json["redirect"], "/verify");
    cookie
}

fn verification_path(app: &TestApp) -> String {
    let mail = app
        .outbox
        .last_to("alice@example.com")
        .expect("verification mail was sent");
    link_path(&mail.body, "/verify_email/")
}

#[tokio::test]
async fn submit_then_verify_creates_account_with_default_portfolio() {
    let app = TestApp::new();
    let cookie = submit(&app).await;

    // Nothing durable exists before verification.
    assert!(app.users.find_user_by_username("alice").await.unwrap().is_none());

    let status = body_json(app.get("/api/verification-status", Some(&cookie)).await).await;
    assert_eq!(status["email"], "alice@example.com");
    assert_eq!(status["email_verified"], false);

    let response = app.get(&verification_path(&app), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["message"],
        "Your account has been created successfully! Please log in."
    );

    let user = app
        .users
        .find_user_by_username("alice")
        .await
        .unwrap()
        .expect("account created");
    let portfolio = app.users.find_portfolio(user.id).await.unwrap().unwrap();
    assert_eq!(portfolio.bio, "College: MIT | Year: 2");
    assert_eq!(portfolio.template_id, 1);
    assert_eq!(portfolio.skill_list(), vec!["HTML", "CSS", "JavaScript"]);

    // The credentials mail followed the verification mail.
    let credentials = app.outbox.last_to("alice@example.com").unwrap();
    assert!(credentials.body.contains("Password: pw123456"));

    // The pending registration is gone from the session.
    let response = app.get("/api/verification-status", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn link_opened_in_another_browser_has_no_session() {
    let app = TestApp::new();
    submit(&app).await;

    let response = app.get(&verification_path(&app), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "No active registration flow. Please register first."
    );
    assert!(app.users.find_user_by_username("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn verification_after_window_is_rejected_and_discards_registration() {
    let app = TestApp::new();
    let cookie = submit(&app).await;
    let path = verification_path(&app);

    app.clock.advance(Duration::minutes(16));

    let response = app.get(&path, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Registration flow expired. Please register again.");

    let response = app.get("/api/verification-status", Some(&cookie)).await;
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "No active registration flow. Please register first."
    );
}

#[tokio::test]
async fn resend_issues_new_link_without_extending_window() {
    let app = TestApp::new();
    let cookie = submit(&app).await;
    let before = body_json(app.get("/verify", Some(&cookie)).await).await;

    app.clock.advance(Duration::minutes(5));
    let response = app.post_form("/resend_verification", Some(&cookie), &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.outbox.messages().len(), 2);

    let after = body_json(app.get("/verify", Some(&cookie)).await).await;
    assert_eq!(before["expires_at"], after["expires_at"]);

    let response = app.get(&verification_path(&app), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn failed_delivery_still_keeps_the_registration_pending() {
    let app = TestApp::new();
    app.outbox.set_failing(true);

    let response = app.post_form("/register", None, FORM).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    let json = body_json(response).await;
    assert_eq!(json["email_sent"], false);

    let status = app.get("/verify", Some(&cookie)).await;
    assert_eq!(status.status(), StatusCode::OK);
}

#[tokio::test]
async fn taken_username_is_rejected_at_submit() {
    let app = TestApp::new();
    app.create_user("alice", false).await;

    let response = app.post_form("/register", None, FORM).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Username already exists.");
    assert!(app.outbox.messages().is_empty());
}

#[tokio::test]
async fn tampered_token_is_invalid() {
    let app = TestApp::new();
    let cookie = submit(&app).await;
    let path = format!("{}x", verification_path(&app));

    let response = app.get(&path, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "The link is invalid.");
}

#[tokio::test]
async fn long_email_and_phone_are_kept_through_verification() {
    let app = TestApp::new();
    let email = format!("{}@example.com", "a".repeat(130));
    let phone = "+44 (0) 20 7946 0958 ext. 12345";

    let response = app
        .post_form(
            "/register",
            None,
            &[
                ("username", "alice"),
                ("password", "pw123456"),
                ("email", email.as_str()),
                ("phone", phone),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();

    let mail = app.outbox.last_to(&email).expect("verification mail was sent");
    let path = link_path(&mail.body, "/verify_email/");
    let response = app.get(&path, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = app
        .users
        .find_user_by_username("alice")
        .await
        .unwrap()
        .expect("account created");
    assert_eq!(user.email, email);
    assert_eq!(user.phone.as_deref(), Some(phone));
}

#[tokio::test]
async fn reserved_route_names_cannot_register() {
    let app = TestApp::new();

    let response = app
        .post_form(
            "/register",
            None,
            &[
                ("username", "dashboard"),
                ("password", "pw123456"),
                ("email", "dash@example.com"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.outbox.messages().is_empty());
}
