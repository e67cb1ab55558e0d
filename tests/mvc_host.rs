//! End-to-end tests for the server-rendered host: backend relays, the
//! sign-in challenge and the load-test escape hatch.

use shopfront::HostKind;

mod common;

#[tokio::test]
async fn home_page_relays_the_catalog_backend() {
    let catalog = common::start_mock_backend(200, "{\"items\":[]}").await;

    let mut config = common::base_config(HostKind::Mvc);
    config.services.catalog = format!("http://{catalog}");
    let addr = common::spawn_host(config).await;

    let res = common::client()
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "{\"items\":[]}");
}

#[tokio::test]
async fn unreachable_backend_becomes_a_bad_gateway() {
    let mut config = common::base_config(HostKind::Mvc);
    config.services.catalog = "http://127.0.0.1:1".to_string();
    let addr = common::spawn_host(config).await;

    let res = common::client()
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);
}

#[tokio::test]
async fn protected_route_challenges_an_anonymous_caller() {
    let addr = common::spawn_host(common::base_config(HostKind::Mvc)).await;

    let res = common::client()
        .get(format!("http://{addr}/order"))
        .send()
        .await
        .unwrap();

    assert!(res.status().is_redirection(), "expected a sign-in redirect");
    let location = res
        .headers()
        .get(reqwest::header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.contains("/connect/authorize"));
    assert!(location.contains("client_id=mvc"));
    assert!(location.contains("state="));
}

#[tokio::test]
async fn load_test_flag_bypasses_the_challenge() {
    let ordering = common::start_mock_backend(200, "orders").await;

    let mut config = common::base_config(HostKind::Mvc);
    config.use_load_test = true;
    config.services.ordering = format!("http://{ordering}");
    let addr = common::spawn_host(config).await;

    let res = common::client()
        .get(format!("http://{addr}/order"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "orders");
}

#[tokio::test]
async fn server_failures_redirect_to_the_error_page_outside_development() {
    let catalog = common::start_mock_backend(500, "boom").await;

    let mut config = common::base_config(HostKind::Mvc);
    config.services.catalog = format!("http://{catalog}");
    let addr = common::spawn_host(config).await;

    let res = common::client()
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_redirection());
    assert_eq!(
        res.headers()
            .get(reqwest::header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap(),
        "/Error"
    );
}
