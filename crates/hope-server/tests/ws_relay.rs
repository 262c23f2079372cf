mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use support::{spawn_app, spawn_app_with, test_config, TestApp};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn ws_url(app: &TestApp) -> String {
    format!("{}/ws", app.base.replacen("http", "ws", 1))
}

async fn connect_with_query(app: &TestApp, token: &str) -> Socket {
    let url = format!("{}?token={token}", ws_url(app));
    let (socket, _) = connect_async(url.as_str()).await.expect("ws connect");
    socket
}

async fn connect_with_bearer(app: &TestApp, token: &str) -> Socket {
    let mut request = ws_url(app)
        .as_str()
        .into_client_request()
        .expect("ws request");
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
    );
    let (socket, _) = connect_async(request).await.expect("ws connect");
    socket
}

async fn send_frame(socket: &mut Socket, frame: Value) {
    socket
        .send(Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

async fn send_raw(socket: &mut Socket, text: &str) {
    socket
        .send(Message::Text(text.to_string().into()))
        .await
        .expect("send frame");
}

async fn next_frame(socket: &mut Socket) -> Value {
    loop {
        let message = timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("frame within 2s")
            .expect("socket open")
            .expect("frame");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("json frame");
        }
    }
}

async fn assert_quiet(socket: &mut Socket) {
    let next = timeout(Duration::from_millis(300), socket.next()).await;
    assert!(next.is_err(), "unexpected frame: {next:?}");
}

async fn join(socket: &mut Socket, room: &str) -> Value {
    send_frame(socket, json!({"event": "join_room", "data": {"room": room}})).await;
    next_frame(socket).await
}

async fn open_room(app: &TestApp, user: &str, doctor_id: &str) -> String {
    let resp = app
        .post("/chats/create", Some(user), json!({"doctorId": doctor_id}))
        .await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("room body");
    body["roomId"].as_str().expect("roomId").to_string()
}

#[tokio::test]
async fn joined_participants_both_receive_relayed_messages() {
    let app = spawn_app().await;
    let (user, user_id) = app.register_user("9876543210", "asha@example.com").await;
    let admin = app.admin_token().await;
    let (doctor, doctor_id) = app.doctor(&admin, "9000000001").await;
    let room = open_room(&app, &user, &doctor_id).await;

    let mut user_socket = connect_with_query(&app, &user).await;
    let mut doctor_socket = connect_with_bearer(&app, &doctor).await;
    for socket in [&mut user_socket, &mut doctor_socket] {
        let joined = join(socket, &room).await;
        assert_eq!(joined, json!({"event": "joined", "data": {"room": room}}));
    }

    send_frame(
        &mut user_socket,
        json!({
            "event": "send_message",
            "data": {"room": room, "message": "hello doctor", "senderId": doctor_id, "senderType": "admin"}
        }),
    )
    .await;
    for socket in [&mut user_socket, &mut doctor_socket] {
        let frame = next_frame(socket).await;
        assert_eq!(frame["event"], "receive_message");
        assert_eq!(frame["data"]["message"], "hello doctor");
        assert_eq!(frame["data"]["senderId"], user_id.as_str());
        assert_eq!(frame["data"]["senderType"], "user");
        assert_eq!(frame["data"]["isSensitive"], false);
    }

    let resp = app.get(&format!("/chats/{room}"), Some(&doctor)).await;
    let history: Value = resp.json().await.expect("history");
    assert_eq!(history["messages"].as_array().expect("messages").len(), 1);
}

#[tokio::test]
async fn joining_twice_delivers_each_message_once() {
    let app = spawn_app().await;
    let (user, _) = app.register_user("9876543210", "asha@example.com").await;
    let admin = app.admin_token().await;
    let (doctor, doctor_id) = app.doctor(&admin, "9000000001").await;
    let room = open_room(&app, &user, &doctor_id).await;

    let mut user_socket = connect_with_query(&app, &user).await;
    assert_eq!(join(&mut user_socket, &room).await["event"], "joined");
    assert_eq!(join(&mut user_socket, &room).await["event"], "joined");

    let doctor_session = app.state.sessions.validate(&doctor).expect("session");
    app.state
        .relay
        .send(&doctor_session, &room, "how are you feeling?")
        .await
        .expect("doctor message");

    let frame = next_frame(&mut user_socket).await;
    assert_eq!(frame["data"]["message"], "how are you feeling?");
    assert_quiet(&mut user_socket).await;
}

#[tokio::test]
async fn bad_frames_and_strangers_get_error_frames() {
    let app = spawn_app().await;
    let (user, _) = app.register_user("9876543210", "asha@example.com").await;
    let (stranger, _) = app.register_user("9876543211", "ravi@example.com").await;
    let admin = app.admin_token().await;
    let (_, doctor_id) = app.doctor(&admin, "9000000001").await;
    let room = open_room(&app, &user, &doctor_id).await;

    let mut socket = connect_with_query(&app, &stranger).await;
    send_raw(&mut socket, "not json").await;
    assert_eq!(
        next_frame(&mut socket).await,
        json!({"event": "error", "data": {"error": "Invalid message format"}})
    );

    let denied = join(&mut socket, &room).await;
    assert_eq!(denied["event"], "error");
    assert_eq!(denied["data"]["error"], "Access denied");

    send_frame(
        &mut socket,
        json!({"event": "send_message", "data": {"room": room, "message": "let me in"}}),
    )
    .await;
    assert_eq!(next_frame(&mut socket).await["data"]["error"], "Access denied");

    let resp = app.get(&format!("/chats/{room}"), Some(&user)).await;
    let history: Value = resp.json().await.expect("history");
    assert!(history["messages"].as_array().expect("messages").is_empty());
}

#[tokio::test]
async fn sending_after_room_end_is_an_error_frame() {
    let mut cfg = test_config();
    cfg.room_duration = Duration::from_secs(1);
    let app = spawn_app_with(cfg).await;
    let (user, _) = app.register_user("9876543210", "asha@example.com").await;
    let admin = app.admin_token().await;
    let (_, doctor_id) = app.doctor(&admin, "9000000001").await;
    let room = open_room(&app, &user, &doctor_id).await;

    let mut socket = connect_with_query(&app, &user).await;
    assert_eq!(join(&mut socket, &room).await["event"], "joined");
    tokio::time::sleep(Duration::from_millis(1_200)).await;

    send_frame(
        &mut socket,
        json!({"event": "send_message", "data": {"room": room, "message": "still there?"}}),
    )
    .await;
    let frame = next_frame(&mut socket).await;
    assert_eq!(frame["event"], "error");
    assert!(frame["data"]["error"]
        .as_str()
        .expect("error text")
        .contains("has ended"));
}

#[tokio::test]
async fn disconnect_releases_room_topics() {
    let app = spawn_app().await;
    let (user, _) = app.register_user("9876543210", "asha@example.com").await;
    let admin = app.admin_token().await;
    let (_, doctor_id) = app.doctor(&admin, "9000000001").await;
    let room = open_room(&app, &user, &doctor_id).await;

    let mut socket = connect_with_query(&app, &user).await;
    assert_eq!(join(&mut socket, &room).await["event"], "joined");
    assert_eq!(app.state.relay.topic_count(), 1);
    let _ = socket.close(None).await;
    drop(socket);

    for _ in 0..100 {
        if app.state.relay.topic_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(app.state.relay.topic_count(), 0);
}

#[tokio::test]
async fn invalid_query_token_is_rejected() {
    let app = spawn_app().await;
    let url = format!("{}?token=not.a.token", ws_url(&app));
    assert!(connect_async(url.as_str()).await.is_err());
}
