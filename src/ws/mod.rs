// ws/mod.rs — WebSocket event server.
//
// Clients connect, authenticate with a JWT in their first frame, and from
// then on only receive JSON-RPC 2.0 notifications pushed by the task
// orchestrator. Frames sent by clients after admission are ignored except
// for Ping (answered) and Close.

pub mod registry;

pub use registry::ConnectionRegistry;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::AppContext;

// ─── JSON-RPC 2.0 types ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const UNAUTHORIZED: i32 = -32004;

/// How long a new connection has to present its token.
const AUTH_DEADLINE: std::time::Duration = std::time::Duration::from_secs(10);

// ─── Server ──────────────────────────────────────────────────────────────────

pub async fn run(ctx: Arc<AppContext>) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.bind_address, ctx.config.ws_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "WebSocket event server listening");

    // Graceful shutdown: resolve on SIGTERM (Unix) or Ctrl-C (all platforms).
    // Pinned so we can use it in the select! loop without moving.
    let shutdown = make_shutdown_future();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("shutdown signal received — stopping WebSocket server");
                break;
            }

            conn = listener.accept() => {
                let (stream, peer) = match conn {
                    Ok(c) => c,
                    Err(e) => {
                        error!(err = %e, "accept error");
                        continue;
                    }
                };
                debug!(peer = %peer, "new connection");
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        warn!(peer = %peer, err = %e, "connection error");
                    }
                });
            }
        }
    }

    info!("WebSocket server stopped");
    Ok(())
}

/// Returns a future that resolves when a shutdown signal is received.
///
/// On Unix we listen for SIGTERM *and* Ctrl-C.
/// On other platforms we listen for Ctrl-C only.
async fn make_shutdown_future() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}

async fn handle_connection(stream: tokio::net::TcpStream, ctx: Arc<AppContext>) -> Result<()> {
    let ws = accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    // ── Connection admission ─────────────────────────────────────────────────
    // The first frame from every client must be an `auth` RPC call carrying a
    // valid signed token. Missing, invalid, or expired tokens reject the
    // connection; so does silence past the deadline.
    let first = tokio::time::timeout(AUTH_DEADLINE, stream.next()).await;

    let text = match first {
        Ok(Some(Ok(Message::Text(t)))) => t,
        // Timeout, connection closed, or non-text frame — reject silently.
        _ => return Ok(()),
    };

    let req: RpcRequest = match serde_json::from_str(&text) {
        Ok(r) => r,
        Err(_) => {
            let _ = sink
                .send(Message::Text(error_response(
                    Value::Null,
                    PARSE_ERROR,
                    "Parse error",
                )))
                .await;
            return Ok(());
        }
    };

    let id = req.id.clone().unwrap_or(Value::Null);

    if req.jsonrpc != "2.0" {
        let _ = sink
            .send(Message::Text(error_response(
                id,
                INVALID_REQUEST,
                "Invalid Request",
            )))
            .await;
        return Ok(());
    }

    if req.method != "auth" {
        let _ = sink
            .send(Message::Text(error_response(
                id,
                UNAUTHORIZED,
                "Unauthorized — send auth first",
            )))
            .await;
        return Ok(());
    }

    let token = req
        .params
        .as_ref()
        .and_then(|p| p.get("token"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let user = match ctx.auth.verify_token(token).await {
        Ok(user) => user,
        Err(_) => {
            let _ = sink
                .send(Message::Text(error_response(
                    id,
                    UNAUTHORIZED,
                    "Unauthorized — invalid token",
                )))
                .await;
            return Ok(());
        }
    };

    // Auth success — acknowledge and join the user's room.
    let resp = serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": { "authenticated": true, "userId": user.id }
    });
    let _ = sink.send(Message::Text(resp.to_string())).await;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn_id = ctx.registry.add(&user.id, tx);
    info!(user_id = %user.id, conn_id, "client connected");

    loop {
        tokio::select! {
            // Incoming frame from client — this channel is push-only after
            // admission, so text frames are ignored.
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(err = %e, "ws error");
                        break;
                    }
                    _ => {}
                }
            }
            // Outgoing event queued by the orchestrator
            event = rx.recv() => {
                match event {
                    Some(frame) => {
                        if let Err(e) = sink.send(Message::Text(frame)).await {
                            warn!(err = %e, "event send error");
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Connections deregister from their room on any exit path.
    ctx.registry.remove(&user.id, conn_id);
    info!(user_id = %user.id, conn_id, "client disconnected");
    Ok(())
}

fn error_response(id: Value, code: i32, message: &str) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
    .to_string()
}
