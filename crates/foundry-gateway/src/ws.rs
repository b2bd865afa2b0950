//! Campaign session stream over WebSocket
//!
//! One run per connection. The first text frame is the start request, every
//! executed node is pushed as a `step` event, and the socket is closed after
//! `done` or `error`. A client that goes away cancels its run.

use crate::server::AppState;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use foundry_agent::RunUpdate;
use foundry_core::{Error, Result, SessionEvent, SessionKey, StartRequest};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub async fn handle_session(socket: WebSocket, state: Arc<AppState>) {
    let key = SessionKey::generate();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let request = match read_start_request(&mut ws_rx).await {
        Ok(req) => req,
        Err(e) => {
            warn!(session = %key, "Rejected session: {}", e);
            send_event(&mut ws_tx, &SessionEvent::error(e.to_string())).await;
            let _ = ws_tx.send(WsMessage::Close(None)).await;
            return;
        }
    };

    let cancel = CancellationToken::new();
    state.sessions.insert(key.clone(), cancel.clone());
    info!(session = %key, topic = ?request.topic, location = ?request.location, "Session started");

    let mut updates = Box::pin(
        state
            .runner
            .clone()
            .stream(request.into_record(), cancel.clone()),
    );

    loop {
        tokio::select! {
            update = updates.next() => match update {
                Some(RunUpdate::Step(event)) => {
                    let msg = SessionEvent::step(event.node, event.step, event.snapshot);
                    match send_event(&mut ws_tx, &msg).await {
                        Delivery::Sent => {}
                        Delivery::Unencodable => {
                            warn!(session = %key, step = event.step, "Step could not be encoded, cancelling run");
                            cancel.cancel();
                            break;
                        }
                        Delivery::ClientGone => {
                            info!(session = %key, "Client gone, cancelling run");
                            cancel.cancel();
                            break;
                        }
                    }
                }
                Some(RunUpdate::Finished(Ok(_))) => {
                    info!(session = %key, "Session complete");
                    send_event(&mut ws_tx, &SessionEvent::Done).await;
                    break;
                }
                Some(RunUpdate::Finished(Err(e))) => {
                    warn!(session = %key, "Run ended early: {}", e);
                    send_event(&mut ws_tx, &SessionEvent::error(e.to_string())).await;
                    break;
                }
                None => break,
            },

            msg = ws_rx.next() => match msg {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => {
                    info!(session = %key, "Client disconnected, cancelling run");
                    cancel.cancel();
                    break;
                }
                // The session takes exactly one request; later frames are ignored.
                Some(Ok(_)) => {}
            },
        }
    }

    state.sessions.remove(&key);
    let _ = ws_tx.send(WsMessage::Close(None)).await;
}

/// Wait for the first text frame and parse it.
async fn read_start_request(ws_rx: &mut SplitStream<WebSocket>) -> Result<StartRequest> {
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => return StartRequest::parse(&text),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => return Err(Error::ConnectionClosed(e.to_string())),
        }
    }
    Err(Error::ConnectionClosed("closed before start request".into()))
}

/// Outcome of pushing one event to the client.
#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    Sent,
    /// The event could not be encoded; an `error` event went out instead.
    Unencodable,
    ClientGone,
}

async fn send_event(ws_tx: &mut SplitSink<WebSocket, WsMessage>, event: &SessionEvent) -> Delivery {
    let (text, delivery) = frame(event.to_json());
    if ws_tx.send(WsMessage::Text(text)).await.is_err() {
        return Delivery::ClientGone;
    }
    delivery
}

/// Wire text for an encoded event. A failed encoding is replaced by an
/// `error` event and ends the session.
fn frame(encoded: Result<String>) -> (String, Delivery) {
    match encoded {
        Ok(json) => (json, Delivery::Sent),
        Err(e) => {
            error!("Failed to encode session event: {}", e);
            let text = SessionEvent::error(format!("failed to encode event: {e}"))
                .to_json()
                .unwrap_or_else(|_| r#"{"event":"error","data":"failed to encode event"}"#.to_string());
            (text, Delivery::Unencodable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_event_passes_through() {
        let json = SessionEvent::Done.to_json().unwrap();
        assert_eq!(frame(Ok(json.clone())), (json, Delivery::Sent));
    }

    #[test]
    fn encode_failure_becomes_error_event() {
        let (text, delivery) = frame(Err(Error::InvalidMessage("non-finite confidence".into())));
        assert_eq!(delivery, Delivery::Unencodable);

        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["event"], "error");
        assert!(v["data"].as_str().unwrap().contains("non-finite confidence"));
    }
}
