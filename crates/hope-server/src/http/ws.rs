// SPDX-License-Identifier: Apache-2.0

//! `GET /ws`: JSON event frames over one socket per client. Each joined room
//! gets a forwarding task that copies relay messages into the socket's
//! outbound queue; the socket loop owns all writes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use hope_api::wire::{ClientFrame, JoinedData, ServerFrame};
use hope_api::ApiError;
use hope_core::RoomId;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::extract::SocketSession;
use crate::relay::{Relay, Subscription};
use crate::session::Session;
use crate::AppState;

const OUTBOUND_CAPACITY: usize = 64;

struct Forwarder {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub(crate) async fn ws_handler(
    State(state): State<AppState>,
    SocketSession(session): SocketSession,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state, session))
}

fn error_frame(err: &hope_core::Error) -> ServerFrame {
    ServerFrame::error(ApiError::from(err).error)
}

fn spawn_forwarder(
    relay: Arc<Relay>,
    mut subscription: Subscription,
    outbound: mpsc::Sender<ServerFrame>,
) -> Forwarder {
    let (stop, mut stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stopped => break,
                next = subscription.recv() => match next {
                    // A full queue must not hide the stop signal.
                    Some(message) => tokio::select! {
                        _ = &mut stopped => break,
                        sent = outbound.send(ServerFrame::ReceiveMessage(message)) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    },
                    None => break,
                },
            }
        }
        relay.leave(subscription);
    });
    Forwarder { stop, task }
}

async fn send_frame(socket: &mut WebSocket, frame: &ServerFrame) -> Result<(), axum::Error> {
    match serde_json::to_string(frame) {
        Ok(text) => socket.send(Message::Text(text)).await,
        Err(e) => {
            warn!("failed to encode server frame: {e}");
            Ok(())
        }
    }
}

async fn handle_frame(
    state: &AppState,
    session: &Session,
    text: &str,
    joined: &mut HashMap<RoomId, Forwarder>,
    outbound: &mpsc::Sender<ServerFrame>,
) -> Option<ServerFrame> {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("undecodable client frame: {e}");
            return Some(ServerFrame::error("Invalid message format"));
        }
    };
    match frame {
        ClientFrame::JoinRoom(data) => match state.relay.join(session, &data.room).await {
            Ok(subscription) => {
                let room_id = subscription.room_id().clone();
                if joined.contains_key(&room_id) {
                    state.relay.leave(subscription);
                } else {
                    let forwarder =
                        spawn_forwarder(Arc::clone(&state.relay), subscription, outbound.clone());
                    joined.insert(room_id.clone(), forwarder);
                }
                Some(ServerFrame::Joined(JoinedData {
                    room: room_id.to_string(),
                }))
            }
            Err(err) => Some(error_frame(&err)),
        },
        ClientFrame::SendMessage(data) => {
            match state.relay.send(session, &data.room, &data.message).await {
                Ok(_) => None,
                Err(err) => Some(error_frame(&err)),
            }
        }
    }
}

async fn serve_socket(mut socket: WebSocket, state: AppState, session: Session) {
    info!(account_id = %session.account_id, role = %session.role, "socket connected");
    let (outbound, mut queued) = mpsc::channel::<ServerFrame>(OUTBOUND_CAPACITY);
    let mut joined: HashMap<RoomId, Forwarder> = HashMap::new();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(message)) = incoming else { break };
                let reply = match message {
                    Message::Text(text) => {
                        handle_frame(&state, &session, &text, &mut joined, &outbound).await
                    }
                    Message::Close(_) => break,
                    _ => None,
                };
                if let Some(frame) = reply {
                    if send_frame(&mut socket, &frame).await.is_err() {
                        break;
                    }
                }
            }
            Some(frame) = queued.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(queued);
    let tasks: Vec<JoinHandle<()>> = joined
        .into_values()
        .map(|forwarder| {
            let _ = forwarder.stop.send(());
            forwarder.task
        })
        .collect();
    for task in tasks {
        let _ = task.await;
    }
    info!(account_id = %session.account_id, "socket disconnected");
}
