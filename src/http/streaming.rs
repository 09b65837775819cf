//! Streaming endpoints: WebSocket echo and Server-Sent Events.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::sse::{Event, Sse};
use axum::response::Response;
use chrono::Utc;
use futures_util::stream::{self, Stream};

/// `GET /ws`: upgrade and echo every frame back.
pub async fn websocket(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(echo_socket)
}

async fn echo_socket(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Close(_) => break,
            message => {
                if socket.send(message).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// `GET /sse`: emit the current time every two seconds until the client
/// disconnects (the stream is dropped with the connection).
pub async fn sse() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let ticker = tokio::time::interval(Duration::from_secs(2));
    let stream = stream::unfold(ticker, |mut ticker| async move {
        ticker.tick().await;
        let event = Event::default().data(format!("The time is {}", Utc::now().to_rfc3339()));
        Some((Ok(event), ticker))
    });
    Sse::new(stream)
}
