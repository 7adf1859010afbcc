// Websocket adapter: access check on upgrade, then group frames in and
// fan-out deliveries out.

use crate::domain::{Grant, GroupError, Permission};
use crate::interface_adapters::handlers::map_access_error;
use crate::interface_adapters::protocol::{ClientFrame, ServerFrame};
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{ConnectionId, GroupRegistry, Outbox, VerifyTokenUseCase};

use axum::{
    extract::{
        Query, State,
        ws::{
            CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code,
            rejection::WebSocketUpgradeRejection,
        },
    },
    response::{IntoResponse, Response},
};
use futures::SinkExt;
use serde_json::Value;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_FRAMES: u32 = 10;

#[derive(Debug)]
enum NetError {
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
}

#[derive(Debug, serde::Deserialize)]
pub struct AccessQuery {
    #[serde(default)]
    access_token: Option<String>,
}

enum LoopControl {
    Continue,
    Disconnect,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<AccessQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    // The token is checked before the upgrade so a bad credential is a plain 401.
    let use_case = VerifyTokenUseCase {
        clock: SystemClock,
        store: state.token_store(),
    };
    let token = query.access_token.unwrap_or_default();
    let grant = match use_case.execute(&token).await {
        Ok(grant) => grant,
        Err(err) => {
            warn!(error = %err, "websocket access denied");
            return map_access_error(err).into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let groups = state.groups.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, groups, grant))
}

struct ConnCtx {
    conn_id: ConnectionId,
    // Token expiry is enforced only at upgrade to avoid mid-match disconnects.
    grant: Grant,
    groups: Arc<GroupRegistry>,
    outbox: Outbox,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_frames: u32,
    last_invalid_log: Instant,

    close_frame: Option<CloseFrame>,
}

async fn handle_socket(socket: WebSocket, groups: Arc<GroupRegistry>, grant: Grant) {
    let conn_id = rand_id();
    let span = info_span!("conn", conn_id);
    run_connection(socket, groups, grant, conn_id)
        .instrument(span)
        .await;
}

async fn run_connection(
    mut socket: WebSocket,
    groups: Arc<GroupRegistry>,
    grant: Grant,
    conn_id: ConnectionId,
) {
    let (outbox, mut deliveries) = mpsc::unbounded_channel::<Arc<str>>();
    let mut ctx = ConnCtx {
        conn_id,
        grant,
        groups,
        outbox,
        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,
        invalid_frames: 0,
        last_invalid_log: Instant::now() - LOG_THROTTLE,
        close_frame: None,
    };

    let connected = ServerFrame::Connected {
        connection_id: conn_id.to_string(),
    };
    if let Err(e) = send_frame(&mut socket, &mut ctx, &connected).await {
        warn!(error = ?e, "failed to greet client");
        return;
    }
    info!("client connected");

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        ctx.msgs_in += 1;
                        ctx.bytes_in += text.len() as u64;
                        match handle_text(&mut socket, &mut ctx, text.as_str()).await {
                            Ok(LoopControl::Continue) => false,
                            Ok(LoopControl::Disconnect) => true,
                            Err(e) => {
                                warn!(error = ?e, "client loop exited with error");
                                true
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        ctx.close_frame = Some(CloseFrame {
                            code: close_code::UNSUPPORTED,
                            reason: "binary messages not supported".into(),
                        });
                        true
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => false,
                    Some(Ok(Message::Close(_))) | None => true,
                    Some(Err(e)) => {
                        debug!(error = %e, "socket read failed");
                        true
                    }
                }
            }

            // Group deliveries, already serialized once by the publisher.
            delivery = deliveries.recv() => {
                match delivery {
                    Some(text) => match forward(&mut socket, &mut ctx, &text).await {
                        Ok(()) => false,
                        Err(e) => {
                            debug!(error = ?e, "delivery failed");
                            true
                        }
                    },
                    None => true,
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    let groups_left = ctx.groups.leave_all(ctx.conn_id).await;
    info!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        groups_left,
        "client disconnected"
    );
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn handle_text(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    text: &str,
) -> Result<LoopControl, NetError> {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            ctx.invalid_frames += 1;
            if should_log(&mut ctx.last_invalid_log) {
                debug!(error = %e, count = ctx.invalid_frames, "invalid client frame dropped");
            }
            if ctx.invalid_frames >= MAX_INVALID_FRAMES {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "too many invalid frames".into(),
                });
                return Ok(LoopControl::Disconnect);
            }
            return Ok(LoopControl::Continue);
        }
    };

    let (ack_id, result) = match frame {
        ClientFrame::JoinGroup { group, ack_id } => (ack_id, join_group(ctx, &group).await),
        ClientFrame::LeaveGroup { group, ack_id } => (ack_id, leave_group(ctx, &group).await),
        ClientFrame::SendToGroup {
            group,
            data,
            data_type,
            no_echo,
            ack_id,
        } => (
            ack_id,
            send_to_group(ctx, &group, &data, data_type.as_deref(), no_echo).await?,
        ),
    };

    match ack_id {
        Some(ack_id) => {
            let ack = ServerFrame::Ack {
                ack_id,
                success: result.is_ok(),
                error: result.err().map(|e| e.code()),
            };
            send_frame(socket, ctx, &ack).await?;
        }
        None => {
            if let Err(e) = result {
                debug!(error = %e, "unacknowledged frame rejected");
            }
        }
    }

    Ok(LoopControl::Continue)
}

async fn join_group(ctx: &ConnCtx, group: &str) -> Result<(), GroupError> {
    if !ctx.grant.allows(Permission::JoinLeaveGroup) {
        return Err(GroupError::Forbidden);
    }
    ctx.groups
        .join(group, ctx.conn_id, ctx.outbox.clone())
        .await?;
    info!(group, "joined group");
    Ok(())
}

async fn leave_group(ctx: &ConnCtx, group: &str) -> Result<(), GroupError> {
    if !ctx.grant.allows(Permission::JoinLeaveGroup) {
        return Err(GroupError::Forbidden);
    }
    if ctx.groups.leave(group, ctx.conn_id).await? {
        info!(group, "left group");
    }
    Ok(())
}

// The outer error is a local serialization failure; the inner one goes back in the ack.
async fn send_to_group(
    ctx: &ConnCtx,
    group: &str,
    data: &Value,
    data_type: Option<&str>,
    no_echo: bool,
) -> Result<Result<(), GroupError>, NetError> {
    if !ctx.grant.allows(Permission::SendToGroup) {
        return Ok(Err(GroupError::Forbidden));
    }

    let message = ServerFrame::Message {
        from: "group",
        group,
        data,
        data_type,
    };
    let text = serde_json::to_string(&message).map_err(NetError::Serialization)?;

    match ctx
        .groups
        .publish(group, ctx.conn_id, no_echo, Arc::from(text))
        .await
    {
        Ok(delivered) => {
            debug!(group, delivered, "group message fanned out");
            Ok(Ok(()))
        }
        Err(e) => Ok(Err(e)),
    }
}

async fn send_frame(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    frame: &ServerFrame<'_>,
) -> Result<(), NetError> {
    let text = serde_json::to_string(frame).map_err(NetError::Serialization)?;
    forward(socket, ctx, &text).await
}

async fn forward(socket: &mut WebSocket, ctx: &mut ConnCtx, text: &str) -> Result<(), NetError> {
    let bytes = text.len() as u64;
    socket
        .send(Message::Text(text.into()))
        .await
        .map_err(NetError::Ws)?;
    ctx.msgs_out += 1;
    ctx.bytes_out += bytes;
    Ok(())
}
