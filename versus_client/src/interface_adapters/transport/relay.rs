// Websocket link to the pub/sub relay, speaking its JSON group protocol.

use crate::domain::{ConnectionError, Link, PeerMessage, RoomCode, TransportKind};
use crate::interface_adapters::protocol::{decode, decode_value, encode};
use crate::interface_adapters::utils::rng::rand_id;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum ClientFrame<'a> {
    JoinGroup {
        group: &'a str,
        ack_id: u64,
    },
    LeaveGroup {
        group: &'a str,
        ack_id: u64,
    },
    SendToGroup {
        group: &'a str,
        data: String,
        data_type: &'static str,
        no_echo: bool,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum ServerFrame {
    Connected {
        connection_id: String,
    },
    Ack {
        ack_id: u64,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    Message {
        group: String,
        data: serde_json::Value,
    },
}

type AckWaiters = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<(), String>>>>>;

pub struct RelayLink {
    group: String,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    disconnected_tx: broadcast::Sender<()>,
    first_listener: Mutex<Option<broadcast::Receiver<()>>>,
    ack_seq: AtomicU64,
    reader: JoinHandle<()>,
}

impl RelayLink {
    /// Opens the websocket, starts dispatching inbound frames, then joins the room group.
    pub async fn open(
        url: &Url,
        room: &RoomCode,
        inbound: mpsc::UnboundedSender<PeerMessage>,
        join_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let conn_id = rand_id();
        let span = info_span!("conn", conn_id, room = %room);

        // The upgrade and the join ack are each bounded by `join_timeout`.
        let (socket, _) = timeout(join_timeout, tokio_tungstenite::connect_async(url.as_str()))
            .await
            .map_err(|_| ConnectionError::HandshakeTimeout)?
            .map_err(|e| ConnectionError::Relay(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        // Subscribed before the reader starts so a drop during the join is kept.
        let (disconnected_tx, first_listener) = broadcast::channel(4);
        let waiters: AckWaiters = Arc::new(Mutex::new(HashMap::new()));
        let group = room.group();

        tokio::spawn(
            async move {
                while let Some(message) = outbound_rx.recv().await {
                    if let Err(e) = sink.send(message).await {
                        debug!(error = %e, "relay write failed");
                        break;
                    }
                }
                let _ = sink.close().await;
            }
            .instrument(span.clone()),
        );

        // The dispatcher exists before the join is sent so no early message is lost.
        let reader = {
            let waiters = waiters.clone();
            let disconnected_tx = disconnected_tx.clone();
            let group = group.clone();
            tokio::spawn(
                async move {
                    while let Some(frame) = stream.next().await {
                        let text = match frame {
                            Ok(Message::Text(text)) => text,
                            Ok(Message::Close(_)) => break,
                            Ok(_) => continue,
                            Err(e) => {
                                debug!(error = %e, "relay read failed");
                                break;
                            }
                        };
                        dispatch(text.as_str(), &group, &inbound, &waiters);
                    }
                    info!("relay connection closed");
                    let _ = disconnected_tx.send(());
                }
                .instrument(span),
            )
        };

        let link = Self {
            group,
            outbound: Some(outbound),
            disconnected_tx,
            first_listener: Mutex::new(Some(first_listener)),
            ack_seq: AtomicU64::new(1),
            reader,
        };

        let ack_id = link.next_ack_id();
        let (ack_tx, ack_rx) = oneshot::channel();
        if let Ok(mut waiters) = waiters.lock() {
            waiters.insert(ack_id, ack_tx);
        }
        link.send_frame(&ClientFrame::JoinGroup {
            group: &link.group,
            ack_id,
        });

        match timeout(join_timeout, ack_rx).await {
            Ok(Ok(Ok(()))) => Ok(link),
            Ok(Ok(Err(reason))) => Err(ConnectionError::JoinRejected(reason)),
            Ok(Err(_)) => Err(ConnectionError::Relay(
                "connection closed during join".to_string(),
            )),
            Err(_) => Err(ConnectionError::JoinTimeout),
        }
    }

    fn next_ack_id(&self) -> u64 {
        self.ack_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn send_frame(&self, frame: &ClientFrame<'_>) {
        let Some(outbound) = self.outbound.as_ref() else {
            return;
        };
        match serde_json::to_string(frame) {
            Ok(text) => {
                let _ = outbound.send(Message::text(text));
            }
            Err(e) => warn!(error = %e, "failed to serialize relay frame"),
        }
    }
}

fn dispatch(
    text: &str,
    group: &str,
    inbound: &mpsc::UnboundedSender<PeerMessage>,
    waiters: &AckWaiters,
) {
    let frame = match serde_json::from_str::<ServerFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(error = %e, "unreadable relay frame dropped");
            return;
        }
    };

    match frame {
        ServerFrame::Connected { connection_id } => {
            debug!(connection_id = %connection_id, "relay session established");
        }
        ServerFrame::Ack {
            ack_id,
            success,
            error,
        } => {
            let waiter = waiters.lock().ok().and_then(|mut w| w.remove(&ack_id));
            if let Some(waiter) = waiter {
                let result = if success {
                    Ok(())
                } else {
                    Err(error.unwrap_or_else(|| "unknown".to_string()))
                };
                let _ = waiter.send(result);
            }
        }
        ServerFrame::Message { group: from, data } => {
            if from != group {
                return;
            }
            let decoded = match data {
                serde_json::Value::String(text) => decode(&text),
                other => decode_value(other),
            };
            match decoded {
                Ok(message) => {
                    let _ = inbound.send(message);
                }
                Err(e) => debug!(error = %e, "malformed peer message dropped"),
            }
        }
    }
}

impl Link for RelayLink {
    fn send(&self, message: &PeerMessage) {
        let data = match encode(message) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, kind = message.kind(), "failed to encode peer message");
                return;
            }
        };
        self.send_frame(&ClientFrame::SendToGroup {
            group: &self.group,
            data,
            data_type: "text",
            no_echo: false,
        });
    }

    fn disconnected(&self) -> broadcast::Receiver<()> {
        let held = self
            .first_listener
            .lock()
            .ok()
            .and_then(|mut listener| listener.take());
        held.unwrap_or_else(|| self.disconnected_tx.subscribe())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Relay
    }

    fn close(&mut self) {
        let ack_id = self.next_ack_id();
        self.send_frame(&ClientFrame::LeaveGroup {
            group: &self.group,
            ack_id,
        });
        if let Some(outbound) = self.outbound.take() {
            let _ = outbound.send(Message::Close(None));
        }
        self.reader.abort();
    }
}

impl Drop for RelayLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PeerId;
    use serde_json::json;

    fn waiters() -> AckWaiters {
        Arc::new(Mutex::new(HashMap::new()))
    }

    #[test]
    fn when_send_frame_is_serialized_then_fields_are_camel_case() {
        let frame = ClientFrame::SendToGroup {
            group: "room:abc",
            data: "{}".to_string(),
            data_type: "text",
            no_echo: false,
        };

        let value = serde_json::to_value(&frame).expect("serialize");

        assert_eq!(
            value,
            json!({"type":"sendToGroup","group":"room:abc","data":"{}","dataType":"text","noEcho":false})
        );
    }

    #[test]
    fn when_group_message_carries_text_then_it_is_decoded_and_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let data = r#"{"type":"join","id":"zzz","roomId":"abc"}"#;
        let frame = json!({"type":"message","group":"room:abc","data":data}).to_string();

        dispatch(&frame, "room:abc", &tx, &waiters());

        let message = rx.try_recv().expect("forwarded");
        assert_eq!(message.sender(), &PeerId::new("zzz"));
    }

    #[test]
    fn when_group_message_is_malformed_or_foreign_then_it_is_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        dispatch("not json", "room:abc", &tx, &waiters());
        dispatch(
            &json!({"type":"message","group":"room:abc","data":"{\"type\":\"bogus\"}"}).to_string(),
            "room:abc",
            &tx,
            &waiters(),
        );
        dispatch(
            &json!({"type":"message","group":"room:other","data":{"type":"join","id":"zzz","roomId":"other"}}).to_string(),
            "room:abc",
            &tx,
            &waiters(),
        );

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn when_ack_arrives_then_matching_waiter_is_resolved() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let waiters = waiters();
        let (ack_tx, mut ack_rx) = oneshot::channel();
        waiters.lock().expect("lock").insert(7, ack_tx);

        dispatch(
            r#"{"type":"ack","ackId":7,"success":false,"error":"Forbidden"}"#,
            "room:abc",
            &tx,
            &waiters,
        );

        assert_eq!(ack_rx.try_recv().expect("resolved"), Err("Forbidden".to_string()));
    }

    #[tokio::test]
    async fn when_relay_never_completes_upgrade_then_open_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        // Accepts the TCP connection and then stays silent.
        let silent = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });
        let url = Url::parse(&format!("ws://{addr}/client")).expect("url");
        let room = RoomCode::parse("abc").expect("room");
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = timeout(
            Duration::from_secs(3),
            RelayLink::open(&url, &room, tx, Duration::from_millis(300)),
        )
        .await
        .expect("open gives up before the outer deadline");

        assert!(matches!(result, Err(ConnectionError::HandshakeTimeout)));
        silent.abort();
    }

    #[tokio::test]
    async fn when_relay_closes_right_after_join_then_late_listener_still_hears_it() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        // Acks the join and hangs up straight away.
        let relay = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(tcp).await.expect("upgrade");
            while let Some(Ok(frame)) = ws.next().await {
                if let Message::Text(text) = frame {
                    let join: serde_json::Value =
                        serde_json::from_str(text.as_str()).expect("join frame");
                    let ack = json!({"type": "ack", "ackId": join["ackId"], "success": true});
                    ws.send(Message::text(ack.to_string())).await.expect("send ack");
                    let _ = ws.close(None).await;
                    break;
                }
            }
        });
        let url = Url::parse(&format!("ws://{addr}/client")).expect("url");
        let room = RoomCode::parse("abc").expect("room");
        let (tx, _rx) = mpsc::unbounded_channel();

        let link = RelayLink::open(&url, &room, tx, Duration::from_secs(2))
            .await
            .expect("join is acked");
        let _ = relay.await;
        // The reader sees the close before anyone subscribes.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut disconnected = link.disconnected();
        let heard = timeout(Duration::from_secs(1), disconnected.recv())
            .await
            .expect("drop is kept for the first listener");
        assert!(heard.is_ok());
    }
}
