//! End-to-end tests for the webhook host's `/check` handshake.

use shopfront::HostKind;

const TOKEN_HEADER: &str = "x-eshop-whtoken";

mod common;

#[tokio::test]
async fn non_options_methods_are_rejected() {
    let addr = common::spawn_host(common::base_config(HostKind::Webhook)).await;
    let client = common::client();

    for method in [reqwest::Method::GET, reqwest::Method::POST] {
        let res = client
            .request(method.clone(), format!("http://{addr}/check"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400, "{method} must not pass the handshake");
    }
}

#[tokio::test]
async fn handshake_echoes_the_configured_token_when_validation_is_off() {
    let mut config = common::base_config(HostKind::Webhook);
    config.webhook.token = "shared-secret".to_string();
    let addr = common::spawn_host(config).await;

    let res = common::client()
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/check"))
        .header(TOKEN_HEADER, "anything-at-all")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get(TOKEN_HEADER).unwrap().to_str().unwrap(),
        "shared-secret"
    );
}

#[tokio::test]
async fn validation_rejects_a_mismatched_token() {
    let mut config = common::base_config(HostKind::Webhook);
    config.webhook.validate_token = true;
    config.webhook.token = "shared-secret".to_string();
    let addr = common::spawn_host(config).await;
    let client = common::client();

    let res = client
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/check"))
        .header(TOKEN_HEADER, "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(res.text().await.unwrap(), "Invalid token");

    // Absent header counts as an empty token and fails the same way.
    let res = client
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/check"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn validation_accepts_the_matching_token() {
    let mut config = common::base_config(HostKind::Webhook);
    config.webhook.validate_token = true;
    config.webhook.token = "shared-secret".to_string();
    let addr = common::spawn_host(config).await;

    let res = common::client()
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/check"))
        .header(TOKEN_HEADER, "shared-secret")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get(TOKEN_HEADER).unwrap().to_str().unwrap(),
        "shared-secret"
    );
}

#[tokio::test]
async fn session_cookie_carries_the_minimum_same_site_policy() {
    let addr = common::spawn_host(common::base_config(HostKind::Webhook)).await;

    let res = common::client()
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("first visit must set the session cookie")
        .to_str()
        .unwrap();
    assert!(cookie.starts_with(".Shopfront.Webhooks.Session="));
    assert!(cookie.contains("SameSite=Lax"));
}
