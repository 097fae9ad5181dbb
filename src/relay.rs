//! # Real-time relay
//!
//! WebSocket connection that broadcasts completed exchanges between sessions.
//! Every subscriber receives every published event, including the publisher's
//! own echo; the reducer appends relayed exchanges as-is.
//!
//! The background task owns the socket. The event loop talks to it through
//! [`RelayClient::publish`] and hears from it as [`Action::RelayExchange`]
//! (or connection status toasts) on the action channel.

use std::sync::mpsc::Sender;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::core::action::Action;
use crate::core::state::Severity;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// One completed exchange as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeEvent {
    pub user_message: String,
    pub ai_response: String,
    /// Display timestamp, `%H:%M:%S`.
    pub timestamp: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Wire envelope. Only `new_message` events are understood; anything else
/// is ignored so the protocol can grow.
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    data: ExchangeEvent,
}

const NEW_MESSAGE: &str = "new_message";

fn encode(event: &ExchangeEvent) -> String {
    // ExchangeEvent contains no non-string keys, so serialization can't fail
    serde_json::to_string(&Frame {
        event: NEW_MESSAGE.to_string(),
        data: event.clone(),
    })
    .unwrap_or_default()
}

fn decode(text: &str) -> Option<ExchangeEvent> {
    match serde_json::from_str::<Frame>(text) {
        Ok(frame) if frame.event == NEW_MESSAGE => Some(frame.data),
        Ok(frame) => {
            debug!("Ignoring relay event '{}'", frame.event);
            None
        }
        Err(e) => {
            warn!("Undecodable relay frame: {}", e);
            None
        }
    }
}

/// Handle for publishing exchanges. Cheap to clone; publishing while the
/// socket is down queues the event for the next connection.
#[derive(Clone)]
pub struct RelayClient {
    outbound: tokio::sync::mpsc::UnboundedSender<ExchangeEvent>,
}

impl RelayClient {
    /// Spawn the connection task and return the publish handle.
    pub fn spawn(url: String, actions: Sender<Action>) -> Self {
        let (outbound, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(run(url, rx, actions));
        Self { outbound }
    }

    pub fn publish(&self, event: ExchangeEvent) {
        // Receiver only drops at shutdown
        let _ = self.outbound.send(event);
    }
}

/// Connect, forward in both directions, reconnect on failure.
async fn run(
    url: String,
    mut outbound: tokio::sync::mpsc::UnboundedReceiver<ExchangeEvent>,
    actions: Sender<Action>,
) {
    let mut first_attempt = true;
    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!("Relay connected to {}", url);
                if !first_attempt {
                    let _ = actions.send(Action::Notify {
                        text: "Reconnected to live updates".to_string(),
                        severity: Severity::Info,
                    });
                }
                first_attempt = false;

                let (mut write, mut read) = socket.split();
                loop {
                    tokio::select! {
                        incoming = read.next() => match incoming {
                            Some(Ok(WsMessage::Text(text))) => {
                                if let Some(event) = decode(&text)
                                    && actions.send(Action::RelayExchange(event)).is_err()
                                {
                                    return;
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                warn!("Relay connection closed");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("Relay read error: {}", e);
                                break;
                            }
                        },
                        event = outbound.recv() => match event {
                            Some(event) => {
                                if let Err(e) = write.send(WsMessage::text(encode(&event))).await {
                                    warn!("Relay write error: {}", e);
                                    break;
                                }
                            }
                            // All publish handles dropped: shutting down
                            None => return,
                        },
                    }
                }
            }
            Err(e) => {
                warn!("Relay connect to {} failed: {}", url, e);
                first_attempt = false;
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
