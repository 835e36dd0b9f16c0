//! Manages the WebSocket connection lifecycle for a live interview.

use super::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use dataready_core::{CandidateAnswer, InterviewState, OrchestratorError, StepOutcome};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{Instrument, error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id))
}

/// Entry point for a new connection: binds the socket to an existing
/// session, registers a transition observer, and runs the message loop.
#[instrument(name = "ws_session", skip_all, fields(session_id = %session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, session_id: String) {
    info!("New WebSocket connection");
    let (socket_tx, socket_rx) = socket.split();
    let socket_tx = Arc::new(Mutex::new(socket_tx));

    let session = match state.orchestrator.get_session(&session_id).await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "rejecting socket for unknown session");
            let mut sink = socket_tx.lock().await;
            let _ = send_msg(
                &mut sink,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    // Forward committed transitions to this socket. The observer stays
    // registered after disconnect; sends to the closed channel are
    // dropped.
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    {
        let id = session_id.clone();
        state.orchestrator.on_state_change(move |sid, from, to| {
            if sid == id {
                let _ = events_tx.send((from, to));
            }
        });
    }

    if send_msg(
        &mut *socket_tx.lock().await,
        ServerMessage::Connected {
            session_id: session_id.clone(),
            state: session.state.to_string(),
        },
    )
    .await
    .is_err()
    {
        error!("Failed to send Connected message to client.");
        return;
    }

    let session_span = tracing::info_span!("interview_runtime", %session_id);
    tokio::spawn(
        async move {
            if let Err(e) =
                run_interview_session(state, socket_tx, socket_rx, events_rx, session_id).await
            {
                error!(error = ?e, "Interview session terminated with error.");
            }
            info!("Interview session finished.");
        }
        .instrument(session_span),
    );
}

/// The main event loop for an active WebSocket session.
async fn run_interview_session(
    state: Arc<AppState>,
    socket_tx: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    mut socket_rx: SplitStream<WebSocket>,
    mut events_rx: mpsc::UnboundedReceiver<(InterviewState, InterviewState)>,
    session_id: String,
) -> Result<()> {
    loop {
        tokio::select! {
            // Client intents.
            msg = socket_rx.next() => {
                let Some(msg_result) = msg else {
                    info!("Client disconnected.");
                    break;
                };
                let ws_msg = match msg_result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(error = %e, "WebSocket read error");
                        break;
                    }
                };
                match ws_msg {
                    Message::Text(text) => {
                        let msg = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => msg,
                            Err(e) => {
                                let mut sink = socket_tx.lock().await;
                                send_msg(&mut sink, ServerMessage::Error {
                                    message: format!("malformed message: {e}"),
                                }).await?;
                                continue;
                            }
                        };
                        let finished = handle_client_message(
                            &state,
                            &socket_tx,
                            &session_id,
                            msg,
                        ).await?;
                        if finished {
                            break;
                        }
                    }
                    Message::Close(_) => {
                        info!("Client closed the connection.");
                        break;
                    }
                    _ => {}
                }
            }
            // Committed state transitions from the orchestrator.
            Some((from, to)) = events_rx.recv() => {
                let mut sink = socket_tx.lock().await;
                send_msg(&mut sink, ServerMessage::StateChange {
                    from: from.to_string(),
                    to: to.to_string(),
                }).await?;
            }
        }
    }
    Ok(())
}

/// Dispatches one client intent to the orchestrator. Returns `true`
/// when the interview is over and the loop should stop.
async fn handle_client_message(
    state: &Arc<AppState>,
    socket_tx: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    session_id: &str,
    msg: ClientMessage,
) -> Result<bool> {
    match msg {
        ClientMessage::Start => match state.orchestrator.start_interview(session_id).await {
            Ok(question) => {
                let mut sink = socket_tx.lock().await;
                send_msg(&mut sink, ServerMessage::Question { question }).await?;
                Ok(false)
            }
            Err(e) => {
                send_error(socket_tx, &e).await?;
                Ok(false)
            }
        },
        ClientMessage::Response { transcript } => {
            submit(state, socket_tx, session_id, CandidateAnswer::Transcript(transcript)).await
        }
        ClientMessage::Skip => {
            submit(state, socket_tx, session_id, CandidateAnswer::Skip).await
        }
        ClientMessage::End => match state.orchestrator.end_interview(session_id).await {
            Ok(report) => {
                let mut sink = socket_tx.lock().await;
                send_msg(&mut sink, ServerMessage::Ended { report }).await?;
                Ok(true)
            }
            Err(e) => {
                send_error(socket_tx, &e).await?;
                Ok(false)
            }
        },
    }
}

async fn submit(
    state: &Arc<AppState>,
    socket_tx: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    session_id: &str,
    answer: CandidateAnswer,
) -> Result<bool> {
    match state.orchestrator.submit_response(session_id, answer).await {
        Ok(StepOutcome::Question(question)) => {
            let mut sink = socket_tx.lock().await;
            send_msg(&mut sink, ServerMessage::Question { question }).await?;
            Ok(false)
        }
        Ok(StepOutcome::Followup(followup)) => {
            let mut sink = socket_tx.lock().await;
            send_msg(&mut sink, ServerMessage::Followup { followup }).await?;
            Ok(false)
        }
        Ok(StepOutcome::Complete(report)) => {
            let mut sink = socket_tx.lock().await;
            send_msg(&mut sink, ServerMessage::Complete { report }).await?;
            Ok(true)
        }
        Err(e) => {
            send_error(socket_tx, &e).await?;
            // An unavailable gateway leaves the session terminal.
            Ok(matches!(e, OrchestratorError::GatewayUnavailable(_)))
        }
    }
}

async fn send_error(
    socket_tx: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    err: &OrchestratorError,
) -> Result<()> {
    warn!(error = %err, "operation failed, reporting to client");
    let mut sink = socket_tx.lock().await;
    send_msg(
        &mut sink,
        ServerMessage::Error {
            message: err.to_string(),
        },
    )
    .await
}

/// Serializes and sends a single server message over the socket.
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let json = serde_json::to_string(&msg)?;
    sink.send(Message::Text(json.into())).await?;
    Ok(())
}
