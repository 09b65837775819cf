//! Streaming and static endpoints: WebSocket echo, SSE, docs pages.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

mod common;

#[tokio::test]
async fn websocket_echoes_frames() {
    let server = common::spawn_default().await;
    let ws_url = format!("{}/ws", server.base_url.replace("http", "ws"));

    let (mut socket, _) = connect_async(&ws_url).await.expect("ws connect");
    socket
        .send(Message::Text("hello".into()))
        .await
        .expect("ws send");

    let echoed = socket.next().await.expect("ws frame").expect("ws read");
    assert_eq!(echoed.into_text().unwrap().as_str(), "hello");

    socket
        .send(Message::Binary(vec![1u8, 2, 3].into()))
        .await
        .unwrap();
    let echoed = socket.next().await.unwrap().unwrap();
    assert_eq!(echoed.into_data().as_ref(), &[1u8, 2, 3]);

    socket.close(None).await.ok();
}

#[tokio::test]
async fn sse_emits_timestamped_events() {
    let server = common::spawn_default().await;
    let client = common::client();

    let response = client.get(server.url("/sse")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let mut stream = response.bytes_stream();
    let first = stream.next().await.expect("one event").expect("bytes");
    let text = String::from_utf8_lossy(&first);
    assert!(
        text.starts_with("data: The time is "),
        "unexpected SSE payload: {text}"
    );
    // Dropping the stream disconnects; the server must simply cope.
}

#[tokio::test]
async fn docs_and_demo_pages_are_served() {
    let server = common::spawn_default().await;
    let client = common::client();

    let response = client
        .get(server.url("/docs/index.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/html"));

    for path in ["/web-ws", "/web-sse", "/docs/streaming.md"] {
        let response = client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 200, "expected 200 for {path}");
    }
}
