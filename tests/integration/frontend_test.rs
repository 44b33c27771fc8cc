use crate::{cgi_response, config_for, http_exchange, split_response};
use interlink_common::{BridgeConfig, RewriteConfig};
use interlink_http::{FrontendConfig, HttpFrontend, LinkHandler};
use interlink_protocol::RequestContext;
use interlink_tests::{env_str, refused_endpoint, StubBackend};
use std::net::SocketAddr;
use tokio::net::TcpListener;

async fn start_frontend(config: &BridgeConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let frontend = HttpFrontend::new(
        FrontendConfig {
            bind: addr,
            ..FrontendConfig::default()
        },
        LinkHandler::new(config).unwrap(),
    );
    tokio::spawn(async move {
        let _ = frontend.serve(listener).await;
    });
    addr
}

fn echo_backend_reply(request: &RequestContext) -> Vec<u8> {
    let body = format!(
        "method={} path={} query={}",
        env_str(request, "REQUEST_METHOD").unwrap_or_default(),
        env_str(request, "PATH_INFO").unwrap_or_default(),
        env_str(request, "QUERY_STRING").unwrap_or_default(),
    );
    cgi_response(&["Content-Type: text/plain", "X-Backend: stub"], body.as_bytes())
}

#[tokio::test]
async fn test_get_served_end_to_end() {
    let backend = StubBackend::tcp(echo_backend_reply).await.unwrap();
    let addr = start_frontend(&config_for(vec![backend.endpoint()])).await;

    let response = http_exchange(addr, "GET /catalog/item?id=3 HTTP/1.0\r\nHost: shop\r\n\r\n").await;
    let (head, body) = split_response(&response);

    assert!(head.starts_with("HTTP/1.0 200") || head.starts_with("HTTP/1.1 200"));
    assert!(head.to_ascii_lowercase().contains("x-backend: stub"));
    assert_eq!(body, "method=GET path=/catalog/item query=id=3");

    let seen = backend.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(env_str(&seen[0], "HTTP_HOST").as_deref(), Some("shop"));
    assert_eq!(seen[0].args()[0].as_ref(), b"0");
}

#[tokio::test]
async fn test_location_prefix_stripped_from_path() {
    let backend = StubBackend::tcp(echo_backend_reply).await.unwrap();
    let mut config = config_for(vec![backend.endpoint()]);
    config.rewrite = RewriteConfig::new("/shop", None);
    let addr = start_frontend(&config).await;

    let response = http_exchange(addr, "GET /shop/page%20one.html?x=1 HTTP/1.0\r\n\r\n").await;
    let (_, body) = split_response(&response);
    assert_eq!(body, "method=GET path=/page one.html query=x=1");

    let seen = backend.requests();
    assert_eq!(env_str(&seen[0], "SCRIPT_NAME").as_deref(), Some("/shop"));
}

#[tokio::test]
async fn test_drop_list_answers_not_found_without_backend() {
    let backend = StubBackend::tcp(echo_backend_reply).await.unwrap();
    let mut config = config_for(vec![backend.endpoint()]);
    config.admission.drop_list = vec![".php".to_string()];
    let addr = start_frontend(&config).await;

    let response = http_exchange(addr, "GET /wp-login.php HTTP/1.0\r\n\r\n").await;
    assert!(response.contains(" 404 "));
    assert_eq!(backend.connections(), 0);
}

#[tokio::test]
async fn test_options_declined_with_allow() {
    let backend = StubBackend::tcp(echo_backend_reply).await.unwrap();
    let addr = start_frontend(&config_for(vec![backend.endpoint()])).await;

    let response = http_exchange(addr, "OPTIONS /anything HTTP/1.0\r\n\r\n").await;
    assert!(response.to_ascii_lowercase().contains("allow: get, put, post"));
    assert_eq!(backend.connections(), 0);
}

#[tokio::test]
async fn test_unreachable_backend_answers_503() {
    let config = config_for(vec![
        refused_endpoint().await.unwrap(),
        refused_endpoint().await.unwrap(),
    ]);
    let addr = start_frontend(&config).await;

    let response = http_exchange(addr, "GET / HTTP/1.0\r\n\r\n").await;
    let (head, body) = split_response(&response);
    assert!(head.contains(" 503 "));
    assert_eq!(body, "Service temporarily unavailable");
}

#[tokio::test]
async fn test_post_body_reaches_backend() {
    let backend = StubBackend::tcp(|request| {
        let body = request.body().cloned().unwrap_or_default();
        cgi_response(&["Content-Type: text/plain"], &body)
    })
    .await
    .unwrap();
    let addr = start_frontend(&config_for(vec![backend.endpoint()])).await;

    let response = http_exchange(
        addr,
        "POST /form HTTP/1.0\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 9\r\n\r\nname=ferr",
    )
    .await;
    let (_, body) = split_response(&response);
    assert_eq!(body, "name=ferr");

    let seen = backend.requests();
    assert_eq!(env_str(&seen[0], "CONTENT_LENGTH").as_deref(), Some("9"));
    assert_eq!(
        env_str(&seen[0], "CONTENT_TYPE").as_deref(),
        Some("application/x-www-form-urlencoded")
    );
}
