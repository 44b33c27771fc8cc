use crate::{cgi_response, config_for};
use http::header::{CONTENT_LENGTH, LOCATION};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;
use interlink_http::{dispatch, FrontendConfig, Handler, HostReply, HostRequest, LinkHandler};
use interlink_tests::{env_str, StubBackend};

#[tokio::test]
async fn test_local_location_with_ok_is_internal() {
    let backend = StubBackend::tcp(|_| {
        cgi_response(
            &["Location: /cart", "Content-Type: text/html"],
            b"<p>this body is never shown</p>",
        )
    })
    .await
    .unwrap();
    let handler = LinkHandler::new(&config_for(vec![backend.endpoint()])).unwrap();

    let request = HostRequest::new(Method::POST, "/checkout".parse().unwrap()).with_body("a=1");
    match handler.handle(request).await {
        HostReply::InternalRedirect { location } => assert_eq!(location, "/cart"),
        other => panic!("expected internal redirect, got {other:?}"),
    }
}

#[tokio::test]
async fn test_absolute_location_is_external() {
    let backend = StubBackend::tcp(|_| {
        cgi_response(
            &["Location: https://example.com/login", "Set-Cookie: s=1"],
            b"",
        )
    })
    .await
    .unwrap();
    let handler = LinkHandler::new(&config_for(vec![backend.endpoint()])).unwrap();

    let request = HostRequest::new(Method::GET, "/account".parse().unwrap());
    match handler.handle(request).await {
        HostReply::Redirect {
            status,
            location,
            headers,
        } => {
            assert_eq!(status, StatusCode::FOUND);
            assert_eq!(location, "https://example.com/login");
            assert_eq!(headers["set-cookie"], "s=1");
        }
        other => panic!("expected external redirect, got {other:?}"),
    }
}

#[tokio::test]
async fn test_local_location_with_other_status_passes_through() {
    let backend = StubBackend::tcp(|_| {
        cgi_response(&["Status: 201 Created", "Location: /items/7"], b"created")
    })
    .await
    .unwrap();
    let handler = LinkHandler::new(&config_for(vec![backend.endpoint()])).unwrap();

    let request = HostRequest::new(Method::POST, "/items".parse().unwrap());
    match handler.handle(request).await {
        HostReply::Response {
            status, headers, ..
        } => {
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(headers[LOCATION], "/items/7");
        }
        other => panic!("expected pass-through, got {other:?}"),
    }
}

#[tokio::test]
async fn test_redirect_redispatched_as_get() {
    let backend = StubBackend::tcp(|request| {
        if env_str(request, "REQUEST_URI").as_deref() == Some("/order") {
            cgi_response(&["Location: /order/done?id=9"], b"discarded")
        } else {
            let method = env_str(request, "REQUEST_METHOD").unwrap_or_default();
            cgi_response(&["Content-Type: text/plain"], format!("done via {method}").as_bytes())
        }
    })
    .await
    .unwrap();
    let handler = LinkHandler::new(&config_for(vec![backend.endpoint()])).unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("7"));
    let request = HostRequest::new(Method::POST, "/order".parse().unwrap())
        .with_headers(headers)
        .with_body("qty=2&x");

    let response = dispatch(&handler, request, &FrontendConfig::default()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"done via GET");

    let seen = backend.requests();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].body().is_some());

    let second = &seen[1];
    assert_eq!(env_str(second, "REQUEST_METHOD").as_deref(), Some("GET"));
    assert_eq!(env_str(second, "REQUEST_URI").as_deref(), Some("/order/done?id=9"));
    assert_eq!(env_str(second, "REDIRECT_STATUS").as_deref(), Some("200"));
    assert!(env_str(second, "CONTENT_LENGTH").is_none());
    assert!(second.body().is_none());
}
