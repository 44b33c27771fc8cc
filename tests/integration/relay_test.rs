use crate::{cgi_response, config_for};
use interlink_core::{resolve, Bridge, Phase, ResponseDisposition};
use interlink_http::read_head;
use interlink_protocol::RequestContext;
use interlink_tests::{env_str, StubBackend};
use tokio::io::BufReader;

fn patterned_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_large_body_relayed_verbatim_over_tcp() {
    let body = patterned_body(300 * 1024 + 17);
    let reply = cgi_response(&["Content-Type: application/octet-stream"], &body);
    let backend = StubBackend::tcp(move |_| reply.clone()).await.unwrap();

    let mut config = config_for(vec![backend.endpoint()]);
    config.segment_capacity = 4096;
    let bridge = Bridge::from_config(&config, false).unwrap();

    let request = RequestContext::new()
        .with_arg("0")
        .with_env("REQUEST_METHOD", "GET")
        .with_env("REQUEST_URI", "/download");
    let conn = bridge.open(&request).await.unwrap();
    assert_eq!(conn.phase(), Phase::AwaitingResponse);

    let mut backend_reader = BufReader::new(conn);
    let head = read_head(&mut backend_reader).await.unwrap();
    assert_eq!(
        resolve(head.status, &head.headers).unwrap(),
        ResponseDisposition::PassThrough
    );

    let mut sink = Vec::new();
    let stats = bridge.relay_to(&mut backend_reader, &mut sink).await.unwrap();

    assert_eq!(sink.len(), body.len());
    assert!(sink == body);
    assert_eq!(stats.bytes_written, body.len() as u64);

    let seen = backend.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].args()[0].as_ref(), b"0");
    assert_eq!(env_str(&seen[0], "REQUEST_URI").as_deref(), Some("/download"));
}

#[tokio::test]
async fn test_slow_client_gets_every_byte() {
    let body = patterned_body(64 * 1024);
    let reply = cgi_response(&["Content-Type: text/plain"], &body);
    let backend = StubBackend::tcp(move |_| reply.clone()).await.unwrap();

    let mut config = config_for(vec![backend.endpoint()]);
    config.segment_capacity = 1024;
    let bridge = Bridge::from_config(&config, false).unwrap();

    let conn = bridge.open(&RequestContext::new()).await.unwrap();
    let mut backend_reader = BufReader::new(conn);
    read_head(&mut backend_reader).await.unwrap();

    // A tiny pipe forces the relay to buffer while the client lags.
    let (mut client_side, mut relay_side) = tokio::io::duplex(128);
    let collector = tokio::spawn(async move {
        use tokio::io::AsyncReadExt;
        let mut out = Vec::new();
        let mut chunk = [0u8; 100];
        loop {
            let n = client_side.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
            tokio::task::yield_now().await;
        }
        out
    });

    bridge
        .relay_to(&mut backend_reader, &mut relay_side)
        .await
        .unwrap();
    drop(relay_side);

    let received = collector.await.unwrap();
    assert!(received == body);
}

#[tokio::test]
async fn test_request_body_sent_as_entity() {
    let backend = StubBackend::tcp(|request| {
        let size = request.body().map_or(0, |b| b.len());
        cgi_response(&[], format!("got {size}").as_bytes())
    })
    .await
    .unwrap();
    let bridge = Bridge::from_config(&config_for(vec![backend.endpoint()]), false).unwrap();

    let request = RequestContext::new()
        .with_env("REQUEST_METHOD", "POST")
        .with_env("CONTENT_LENGTH", "11")
        .with_body("hello world");
    let mut backend_reader = BufReader::new(bridge.open(&request).await.unwrap());
    read_head(&mut backend_reader).await.unwrap();
    let mut sink = Vec::new();
    bridge.relay_to(&mut backend_reader, &mut sink).await.unwrap();

    assert_eq!(sink, b"got 11");
    assert_eq!(
        backend.requests()[0].body().map(AsRef::as_ref),
        Some(&b"hello world"[..])
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_relay_over_unix_socket() {
    let backend = StubBackend::unix(|_| cgi_response(&["Status: 404 Not Found"], b"missing"))
        .await
        .unwrap();
    let bridge = Bridge::from_config(&config_for(vec![backend.endpoint()]), false).unwrap();

    let mut backend_reader = BufReader::new(bridge.open(&RequestContext::new()).await.unwrap());
    let head = read_head(&mut backend_reader).await.unwrap();
    assert_eq!(head.status, http::StatusCode::NOT_FOUND);

    let mut sink = Vec::new();
    bridge.relay_to(&mut backend_reader, &mut sink).await.unwrap();
    assert_eq!(sink, b"missing");
}
