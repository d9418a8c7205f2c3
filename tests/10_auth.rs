mod common;

use anyhow::Result;
use reqwest::{header, StatusCode};
use serde_json::Value;

use common::{TestServer, PASSWORD};
use guardrail_api::config::AppConfig;

#[tokio::test]
async fn health_reports_disabled_database() -> Result<()> {
    let server = TestServer::start().await?;
    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["database"], "disabled");
    Ok(())
}

#[tokio::test]
async fn login_issues_bearer_and_cookie() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user("ada@example.com").await?;

    let res = server.login_response("ada@example.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/vnd.api+json");

    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("login sets the guard cookie");
    assert!(cookie.starts_with(&format!("{}=", server.cookie_name())));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=None"));
    assert!(cookie.contains("Path=/"));
    assert!(!cookie.contains("Secure"), "local cookies are not secure: {}", cookie);

    let body: Value = res.json().await?;
    assert_eq!(body["data"]["type"], "users");
    assert_eq!(body["data"]["id"], user.id.to_string());
    assert!(body["data"]["attributes"].get("password").is_none());

    let bearer = body["meta"]["token"].as_str().expect("token in meta");
    let (id, secret) = bearer.split_once('|').expect("bearer has a delimiter");
    assert!(id.parse::<i64>().is_ok());
    assert_eq!(secret.len(), 100);
    assert!(cookie.contains(bearer));
    Ok(())
}

#[tokio::test]
async fn bearer_header_and_cookie_both_resolve_the_user() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user("ada@example.com").await?;
    let bearer = server.login("ada@example.com").await?;

    let res = server.get_with_bearer("/api/auth/user", &bearer).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["id"], user.id.to_string());

    let res = server
        .client
        .get(server.url("/api/auth/user"))
        .header(header::COOKIE, format!("{}={}", server.cookie_name(), bearer))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn every_bad_bearer_is_the_same_401() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user("ada@example.com").await?;
    let bearer = server.login("ada@example.com").await?;
    let (id, _) = bearer.split_once('|').unwrap_or_default();

    let forged = vec![
        "no-delimiter".to_string(),
        "999|whatever".to_string(),
        format!("{}|wrong-secret", id),
        "abc|def".to_string(),
    ];

    let mut bodies = Vec::new();
    for candidate in &forged {
        let res = server.get_with_bearer("/api/auth/user", candidate).await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "bearer {}", candidate);
        bodies.push(res.json::<Value>().await?);
    }

    // deleted user and deactivated user look exactly the same
    let res = server.login_response("nobody@example.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let unknown: Value = res.json().await?;
    assert_eq!(unknown, body);

    server.users.set_active(user.id, false).await;
    let res = server.get_with_bearer("/api/auth/user", &bearer).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    bodies.push(res.json::<Value>().await?);

    server.users.remove(user.id).await;
    let res = server.get_with_bearer("/api/auth/user", &bearer).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    bodies.push(res.json::<Value>().await?);

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(bodies[0]["message"], "Unauthenticated.");
    assert_eq!(bodies[0]["status"], 401);
    Ok(())
}

#[tokio::test]
async fn missing_credentials_are_unauthenticated() -> Result<()> {
    let server = TestServer::start().await?;
    let res = server.client.get(server.url("/api/auth/user")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_the_token_and_expires_the_cookie() -> Result<()> {
    let server = TestServer::start().await?;
    server.user("ada@example.com").await?;
    let bearer = server.login("ada@example.com").await?;
    assert_eq!(server.tokens.len().await, 1);

    let res = server
        .client
        .post(server.url("/api/auth/logout"))
        .bearer_auth(&bearer)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with(&format!("{}=;", server.cookie_name())), "{}", cookie);
    assert!(cookie.contains("Max-Age=0"));

    assert_eq!(server.tokens.len().await, 0);
    let res = server.get_with_bearer("/api/auth/user", &bearer).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_validation_errors_are_422() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client
        .post(server.url("/auth/login"))
        .json(&serde_json::json!({ "email": "not-an-email" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["errors"]["email"][0], "The email field must be a valid email address.");
    assert_eq!(body["errors"]["password"][0], "The password field is required.");

    let res = server.login_response("ada@example..com", "x").await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await?;
    assert_eq!(body["errors"]["email"], serde_json::json!(["The email field must be a valid email address."]));

    let res = server
        .client
        .post(server.url("/auth/login"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("[1, 2]")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_inactive_users_cannot_log_in() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user("ada@example.com").await?;

    let res = server.login_response("ada@example.com", "nope").await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await?;
    assert_eq!(body["errors"]["email"][0], "These credentials do not match our records.");

    server.users.set_active(user.id, false).await;
    let res = server.login_response("ada@example.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(server.tokens.len().await, 0);
    Ok(())
}

#[tokio::test]
async fn repeated_failures_are_throttled() -> Result<()> {
    let mut config = AppConfig::local();
    config.auth.max_login_attempts = 2;
    let server = TestServer::start_with(config).await?;
    server.user("ada@example.com").await?;

    for _ in 0..2 {
        let res = server.login_response("ada@example.com", "nope").await?;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    // even the right password is refused until the window passes
    let res = server.login_response("Ada@Example.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().contains_key(header::RETRY_AFTER));
    let body: Value = res.json().await?;
    assert!(body["retry_after"].as_u64().unwrap_or(0) > 0);
    Ok(())
}
