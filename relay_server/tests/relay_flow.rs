mod support;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn unique_group() -> String {
    format!("room:{}", uuid::Uuid::new_v4().simple())
}

async fn negotiate(base_url: &str) -> String {
    let payload: Value = reqwest::get(format!("{base_url}/api/negotiate"))
        .await
        .expect("negotiate request should succeed")
        .json()
        .await
        .expect("negotiate body should be json");
    payload["url"]
        .as_str()
        .expect("negotiate should return a url")
        .to_string()
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let frame = timeout(RECV_TIMEOUT, socket.next())
            .await
            .expect("frame should arrive in time")
            .expect("socket should stay open")
            .expect("frame should be readable");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("frame should be json");
        }
    }
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::text(value.to_string()))
        .await
        .expect("frame should send");
}

async fn connect(base_url: &str) -> Socket {
    let url = negotiate(base_url).await;
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .expect("websocket should connect");
    let greeting = next_json(&mut socket).await;
    assert_eq!(greeting["type"], "connected");
    socket
}

async fn join(socket: &mut Socket, group: &str, ack_id: u64) -> Value {
    send_json(
        socket,
        json!({"type": "joinGroup", "group": group, "ackId": ack_id}),
    )
    .await;
    next_json(socket).await
}

#[tokio::test]
async fn when_negotiate_is_called_then_url_points_at_client_endpoint() {
    let base_url = support::ensure_server();

    let url = negotiate(base_url).await;

    let host = base_url.trim_start_matches("http://");
    assert!(url.starts_with(&format!("ws://{host}/client?access_token=")));
}

#[tokio::test]
async fn when_member_sends_then_every_member_receives_including_sender() {
    let base_url = support::ensure_server();
    let group = unique_group();
    let mut alice = connect(base_url).await;
    let mut bob = connect(base_url).await;

    let ack = join(&mut alice, &group, 1).await;
    assert_eq!(ack, json!({"type": "ack", "ackId": 1, "success": true}));
    join(&mut bob, &group, 1).await;

    let data = r#"{"type":"join","id":"aaa","roomId":"abc"}"#;
    send_json(
        &mut alice,
        json!({"type": "sendToGroup", "group": group, "data": data, "dataType": "text", "noEcho": false}),
    )
    .await;

    for socket in [&mut bob, &mut alice] {
        let message = next_json(socket).await;
        assert_eq!(message["type"], "message");
        assert_eq!(message["group"], group.as_str());
        assert_eq!(message["data"], data);
    }
}

#[tokio::test]
async fn when_no_echo_is_requested_then_sender_does_not_hear_itself() {
    let base_url = support::ensure_server();
    let group = unique_group();
    let mut alice = connect(base_url).await;
    let mut bob = connect(base_url).await;
    join(&mut alice, &group, 1).await;
    join(&mut bob, &group, 1).await;

    send_json(
        &mut alice,
        json!({"type": "sendToGroup", "group": group, "data": {"n": 1}, "noEcho": true}),
    )
    .await;

    let message = next_json(&mut bob).await;
    assert_eq!(message["data"], json!({"n": 1}));
    assert!(
        timeout(Duration::from_millis(200), alice.next()).await.is_err(),
        "sender should not receive its own message"
    );
}

#[tokio::test]
async fn when_member_leaves_group_then_it_stops_receiving() {
    let base_url = support::ensure_server();
    let group = unique_group();
    let mut alice = connect(base_url).await;
    let mut bob = connect(base_url).await;
    join(&mut alice, &group, 1).await;
    join(&mut bob, &group, 1).await;

    send_json(
        &mut bob,
        json!({"type": "leaveGroup", "group": group, "ackId": 2}),
    )
    .await;
    assert_eq!(next_json(&mut bob).await["success"], true);

    send_json(
        &mut alice,
        json!({"type": "sendToGroup", "group": group, "data": "hi", "noEcho": true}),
    )
    .await;

    assert!(timeout(Duration::from_millis(200), bob.next()).await.is_err());
}

#[tokio::test]
async fn when_group_name_is_blank_then_ack_reports_invalid_request() {
    let base_url = support::ensure_server();
    let mut alice = connect(base_url).await;

    let ack = join(&mut alice, "  ", 9).await;

    assert_eq!(ack["ackId"], 9);
    assert_eq!(ack["success"], false);
    assert_eq!(ack["error"], "InvalidRequest");
}

#[tokio::test]
async fn when_access_token_is_unknown_then_client_endpoint_returns_401() {
    let base_url = support::ensure_server();

    let res = reqwest::get(format!("{base_url}/client?access_token=bogus"))
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);
}
