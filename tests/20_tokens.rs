mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{TestServer, PASSWORD};

#[tokio::test]
async fn user_document_includes_each_token_once() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user("ada@example.com").await?;
    let first = server.login("ada@example.com").await?;
    let second = server.login("ada@example.com").await?;

    let res = server.get_with_bearer("/api/auth/user", &second).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;

    let related = body["data"]["relationships"]["tokens"]["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(related.len(), 2);

    let included = body["included"].as_array().cloned().unwrap_or_default();
    assert_eq!(included.len(), 2, "tokens once each, owner never repeated");
    for entry in &included {
        assert_eq!(entry["type"], "database_tokens");
        assert_eq!(entry["relationships"]["owner"]["data"]["id"], user.id.to_string());
        assert!(entry["attributes"].get("hash").is_none());
    }

    let current_id = second.split('|').next().unwrap_or_default();
    let current: Vec<&Value> = included.iter().filter(|e| e["meta"]["current"] == true).collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0]["id"], current_id);
    assert_ne!(first.split('|').next(), Some(current_id));
    Ok(())
}

#[tokio::test]
async fn tokens_are_paginated_newest_first() -> Result<()> {
    let server = TestServer::start().await?;
    server.user("ada@example.com").await?;
    let mut bearers = Vec::new();
    for _ in 0..5 {
        bearers.push(server.login("ada@example.com").await?);
    }
    let bearer = bearers.last().cloned().unwrap_or_default();

    let res = server
        .get_with_bearer("/api/auth/tokens?page=2&per_page=2", &bearer)
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;

    let ids: Vec<&str> = body["data"]
        .as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec!["3", "2"]);
    assert_eq!(body["meta"], json!({
        "page": 2,
        "per_page": 2,
        "next": 3,
        "prev": 1,
        "count": 5,
        "last_page": 3
    }));
    Ok(())
}

#[tokio::test]
async fn oversized_pages_are_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    server.user("ada@example.com").await?;
    let bearer = server.login("ada@example.com").await?;

    let max = server.config.api.max_page_size + 1;
    let res = server
        .get_with_bearer(&format!("/api/auth/tokens?per_page={}", max), &bearer)
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await?;
    assert!(body["errors"]["per_page"][0].as_str().unwrap_or_default().contains("not be greater than"));

    let res = server.get_with_bearer("/api/auth/tokens?page=zero", &bearer).await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn pages_past_the_addressable_range_are_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    server.user("ada@example.com").await?;
    let bearer = server.login("ada@example.com").await?;

    let res = server
        .get_with_bearer(&format!("/api/auth/tokens?page={}&per_page=10", i64::MAX), &bearer)
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await?;
    assert_eq!(body["errors"]["page"][0], "page is out of range");

    // the server keeps serving afterwards
    let res = server.get_with_bearer("/api/auth/tokens", &bearer).await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn simple_pages_skip_the_count() -> Result<()> {
    let server = TestServer::start().await?;
    server.user("ada@example.com").await?;
    let mut bearer = String::new();
    for _ in 0..3 {
        bearer = server.login("ada@example.com").await?;
    }

    let res = server
        .get_with_bearer("/api/auth/tokens?simple=1&per_page=2", &bearer)
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["meta"], json!({ "page": 1, "per_page": 2, "next": 2, "prev": null }));

    let res = server
        .get_with_bearer("/api/auth/tokens?simple=true&per_page=2&page=2", &bearer)
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["meta"]["next"], Value::Null);
    assert_eq!(body["meta"]["prev"], 1);
    Ok(())
}

#[tokio::test]
async fn logout_other_devices_keeps_the_current_token() -> Result<()> {
    let server = TestServer::start().await?;
    server.user("ada@example.com").await?;
    let other = server.login("ada@example.com").await?;
    let current = server.login("ada@example.com").await?;

    let res = server
        .client
        .post(server.url("/api/auth/logout-other-devices"))
        .bearer_auth(&current)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["meta"]["revoked"], 1);

    assert_eq!(server.get_with_bearer("/api/auth/user", &current).await?.status(), StatusCode::OK);
    assert_eq!(
        server.get_with_bearer("/api/auth/user", &other).await?.status(),
        StatusCode::UNAUTHORIZED
    );
    Ok(())
}

#[tokio::test]
async fn password_change_revokes_everything_and_reissues() -> Result<()> {
    let server = TestServer::start().await?;
    server.user("ada@example.com").await?;
    let other = server.login("ada@example.com").await?;
    let current = server.login("ada@example.com").await?;

    let res = server
        .client
        .put(server.url("/api/auth/password"))
        .bearer_auth(&current)
        .json(&json!({
            "current_password": "wrong",
            "password": "a brand new secret",
            "password_confirmation": "a brand new secret"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await?;
    assert_eq!(body["errors"]["current_password"][0], "The provided password is incorrect.");

    let res = server
        .client
        .put(server.url("/api/auth/password"))
        .bearer_auth(&current)
        .json(&json!({
            "current_password": PASSWORD,
            "password": "a brand new secret",
            "password_confirmation": "something else"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = server
        .client
        .put(server.url("/api/auth/password"))
        .bearer_auth(&current)
        .json(&json!({
            "current_password": PASSWORD,
            "password": "a brand new secret",
            "password_confirmation": "a brand new secret"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["meta"]["revoked"], 2);
    let fresh = body["meta"]["token"].as_str().unwrap_or_default().to_string();

    for stale in [&other, &current] {
        assert_eq!(
            server.get_with_bearer("/api/auth/user", stale).await?.status(),
            StatusCode::UNAUTHORIZED
        );
    }
    assert_eq!(server.get_with_bearer("/api/auth/user", &fresh).await?.status(), StatusCode::OK);
    assert_eq!(server.tokens.len().await, 1);

    let res = server.login_response("ada@example.com", "a brand new secret").await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}
