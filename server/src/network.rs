//! Connection adapter: one WebSocket per player
//!
//! Each accepted socket is split into two halves served by two tasks:
//! - a reader that decodes inbound JSON and forwards it to the hub
//! - a writer that drains the client's outbound queue and sends keepalive pings
//!
//! The tasks share nothing but the queue. When the hub drops the client, the
//! queue closes, the writer sends a close frame and the connection ends. When
//! the reader fails for any reason it always asks the hub to unregister.

use crate::client_manager::{ClientId, Frame};
use crate::error::{Error, Result};
use crate::hub::HubHandle;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, get_service};
use axum::Router;
use futures_util::stream::{SplitSink, Stream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::Envelope;
use std::path::Path;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Duration, Instant};
use tower_http::services::ServeFile;

/// Time between keepalive pings on an otherwise quiet connection.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// Deadline for a single keepalive ping write.
pub const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the HTTP surface: the game page on `/` and the socket on `/ws`
///
/// Non-GET requests to `/` are answered with 405 by the method router.
pub fn router(hub: HubHandle, static_dir: &Path) -> Router {
    Router::new()
        .route(
            "/",
            get_service(ServeFile::new(static_dir.join("index.html"))),
        )
        .route("/ws", get(ws_handler))
        .with_state(hub)
}

async fn ws_handler(State(hub): State<HubHandle>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_client(socket, hub))
}

/// Runs one client from handshake to disconnect
pub async fn serve_client(socket: WebSocket, hub: HubHandle) {
    let (client, queue) = hub.new_client();
    let client_id = client.id;

    if let Err(e) = hub.register(client).await {
        warn!("Could not register client {}: {}", client_id, e);
        return;
    }
    info!("Client {} connected", client_id);

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(client_id, sink, queue, KEEPALIVE_INTERVAL));

    let writer_done = tokio::select! {
        result = read_loop(client_id, stream, &hub) => {
            match result {
                Ok(()) => debug!("Client {} closed the connection", client_id),
                Err(e) => warn!("Client {} read failed: {}", client_id, e),
            }
            false
        }
        result = &mut writer => {
            if let Ok(Err(e)) = result {
                debug!("Client {} write failed: {}", client_id, e);
            }
            true
        }
    };

    if let Err(e) = hub.unregister(client_id).await {
        debug!("Client {} unregister skipped: {}", client_id, e);
    }

    // Unregistering closes the queue, so the writer is on its way out.
    if !writer_done {
        let _ = writer.await;
    }
    info!("Client {} disconnected", client_id);
}

/// Forwards decoded messages to the hub until the stream ends
///
/// A clean close returns `Ok`; transport errors and undecodable payloads
/// end the loop with an error.
pub async fn read_loop<S>(client_id: ClientId, mut stream: S, hub: &HubHandle) -> Result<()>
where
    S: Stream<Item = std::result::Result<Message, axum::Error>> + Unpin,
{
    while let Some(message) = stream.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Message::Close(_) => return Ok(()),
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let (envelope, raw) = decode_input(&text)?;
        hub.input(client_id, envelope, raw).await?;
    }

    Ok(())
}

/// Normalizes an inbound text frame and decodes it
///
/// Returns the envelope together with the normalized text, which is what
/// gets echoed to the other players.
pub fn decode_input(text: &str) -> Result<(Envelope, Frame)> {
    let normalized = text.replace('\n', " ");
    let normalized = normalized.trim();
    let envelope = serde_json::from_str(normalized).map_err(Error::Decode)?;
    Ok((envelope, Frame::from(normalized)))
}

/// Sends queued frames and keepalive pings until the queue closes
async fn write_loop(
    client_id: ClientId,
    mut sink: SplitSink<WebSocket, Message>,
    mut queue: mpsc::Receiver<Frame>,
    keepalive: Duration,
) -> Result<()> {
    let mut ping = interval_at(Instant::now() + keepalive, keepalive);

    loop {
        tokio::select! {
            frame = queue.recv() => match frame {
                Some(frame) => {
                    let text = coalesce(frame, &mut queue);
                    sink.send(Message::Text(text)).await?;
                }
                None => {
                    debug!("Queue of client {} closed, sending close frame", client_id);
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = sink.close().await;
                    return Ok(());
                }
            },
            _ = ping.tick() => {
                match timeout(PING_TIMEOUT, sink.send(Message::Ping(Vec::new()))).await {
                    Ok(result) => result?,
                    Err(_) => return Err(Error::PingTimeout),
                }
            }
        }
    }
}

/// Joins `first` with every frame already waiting, one per line
///
/// The queue is bounded, so this drains at most its capacity.
pub fn coalesce(first: Frame, queue: &mut mpsc::Receiver<Frame>) -> String {
    let mut text = String::from(&*first);

    while let Ok(frame) = queue.try_recv() {
        text.push('\n');
        text.push_str(&frame);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::HubEvent;
    use futures_util::stream;
    use shared::Input;

    fn test_hub() -> (HubHandle, mpsc::Receiver<HubEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (HubHandle::new(tx, 8), rx)
    }

    #[test]
    fn test_decode_input_normalizes() {
        let (envelope, raw) = decode_input("  {\"action\":\n\"MOVE_UP\"}\n").unwrap();
        assert_eq!(envelope.input(), Some(Input::MoveUp));
        assert_eq!(&*raw, "{\"action\": \"MOVE_UP\"}");
    }

    #[test]
    fn test_decode_input_malformed() {
        assert!(matches!(decode_input("{oops"), Err(Error::Decode(_))));
        assert!(matches!(decode_input(""), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_input_keeps_unknown_actions() {
        let (envelope, _) = decode_input(r#"{"action":"WAVE","content":[1,2]}"#).unwrap();
        assert_eq!(envelope.action, "WAVE");
        assert!(envelope.input().is_none());
    }

    #[tokio::test]
    async fn test_coalesce_pending_frames() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(Frame::from("b")).await.unwrap();
        tx.send(Frame::from("c")).await.unwrap();

        assert_eq!(coalesce(Frame::from("a"), &mut rx), "a\nb\nc");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_coalesce_single_frame() {
        let (_tx, mut rx) = mpsc::channel::<Frame>(8);
        assert_eq!(coalesce(Frame::from("only"), &mut rx), "only");
    }

    #[tokio::test]
    async fn test_read_loop_forwards_inputs() {
        let (hub, mut events) = test_hub();
        let messages = stream::iter(vec![
            Ok(Message::Text(r#"{"action":"MOVE_UP"}"#.to_string())),
            Ok(Message::Ping(vec![1])),
            Ok(Message::Binary(br#"{"action":"MOVE_DOWN"}"#.to_vec())),
            Ok(Message::Close(None)),
            Ok(Message::Text(r#"{"action":"MOVE_UP"}"#.to_string())),
        ]);

        read_loop(4, messages, &hub).await.unwrap();

        let mut inputs = Vec::new();
        while let Ok(event) = events.try_recv() {
            match event {
                HubEvent::Input {
                    client_id,
                    envelope,
                    ..
                } => {
                    assert_eq!(client_id, 4);
                    inputs.push(envelope.input().unwrap());
                }
                other => panic!("Unexpected event {:?}", other),
            }
        }
        assert_eq!(inputs, vec![Input::MoveUp, Input::MoveDown]);
    }

    #[tokio::test]
    async fn test_read_loop_stops_on_malformed() {
        let (hub, mut events) = test_hub();
        let messages = stream::iter(vec![
            Ok(Message::Text("not json".to_string())),
            Ok(Message::Text(r#"{"action":"MOVE_UP"}"#.to_string())),
        ]);

        let result = read_loop(1, messages, &hub).await;

        assert!(matches!(result, Err(Error::Decode(_))));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_read_loop_ends_with_stream() {
        let (hub, _events) = test_hub();
        let messages = stream::iter(Vec::<std::result::Result<Message, axum::Error>>::new());
        assert!(read_loop(1, messages, &hub).await.is_ok());
    }

    #[tokio::test]
    async fn test_read_loop_reports_closed_hub() {
        let (hub, events) = test_hub();
        drop(events);
        let messages = stream::iter(vec![Ok(Message::Text(
            r#"{"action":"MOVE_UP"}"#.to_string(),
        ))]);

        let result = read_loop(1, messages, &hub).await;
        assert!(matches!(result, Err(Error::HubClosed)));
    }
}
