mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};

use support::spawn_app;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn next_event(ws: &mut WsClient) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("websocket error");
        if let TungsteniteMessage::Text(text) = frame {
            return serde_json::from_str(&text).expect("event json");
        }
    }
}

async fn send_event(ws: &mut WsClient, event: Value) {
    ws.send(TungsteniteMessage::Text(event.to_string().into()))
        .await
        .expect("send event");
}

#[tokio::test]
async fn websocket_private_chat_flow() {
    let app = spawn_app().await;
    let alice_token = app.register("alice@x.com", "Alice").await;
    let bob_token = app.register("bob@x.com", "Bob").await;
    let client = Client::new();

    // alice 解析与 bob 的私聊房间
    let created = client
        .post(app.http("/api/v1/chats"))
        .bearer_auth(&alice_token)
        .json(&json!({"peer": "bob@x.com"}))
        .send()
        .await
        .expect("create chat")
        .json::<Value>()
        .await
        .expect("chat json");
    let room_id = created["room_id"].as_str().expect("room id").to_owned();

    // 再次解析（从 bob 方向）得到同一个房间
    let resolved = client
        .post(app.http("/api/v1/chats"))
        .bearer_auth(&bob_token)
        .json(&json!({"peer": "alice@x.com"}))
        .send()
        .await
        .expect("resolve chat")
        .json::<Value>()
        .await
        .expect("chat json");
    assert_eq!(resolved["room_id"].as_str().unwrap(), room_id);

    let (mut alice_ws, _) = connect_async(app.ws(&alice_token)).await.expect("alice ws");
    let (mut bob_ws, _) = connect_async(app.ws(&bob_token)).await.expect("bob ws");

    send_event(&mut alice_ws, json!({"type": "join", "room_id": room_id})).await;
    assert_eq!(next_event(&mut alice_ws).await["type"], "joined");
    send_event(&mut bob_ws, json!({"type": "join", "room_id": room_id})).await;
    assert_eq!(next_event(&mut bob_ws).await["type"], "joined");

    send_event(
        &mut alice_ws,
        json!({"type": "send", "room_id": room_id, "body": "hi"}),
    )
    .await;

    // 发送方收到 ack 和自己的回显投递，顺序不定
    let first = next_event(&mut alice_ws).await;
    let second = next_event(&mut alice_ws).await;
    let (ack, echoed) = if first["type"] == "ack" {
        (first, second)
    } else {
        (second, first)
    };
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["sequence"], 1);
    assert_eq!(echoed["type"], "delivered");
    assert_eq!(echoed["message"]["body"], "hi");

    // 对端收到投递，载荷携带发送者标识、显示名和 时:分 展示时间
    let delivered = next_event(&mut bob_ws).await;
    assert_eq!(delivered["type"], "delivered");
    assert_eq!(delivered["room_id"].as_str().unwrap(), room_id);
    assert_eq!(delivered["message"]["body"], "hi");
    assert_eq!(delivered["message"]["sender"], "alice@x.com");
    assert_eq!(delivered["message"]["sender_name"], "Alice");
    let clock = delivered["message"]["formatted_time"].as_str().unwrap();
    assert_eq!(clock.len(), 5);
    assert_eq!(clock.as_bytes()[2], b':');

    // 历史回放恰好一条，与投递载荷一致
    let history = client
        .get(app.http(&format!("/api/v1/rooms/{room_id}/messages")))
        .bearer_auth(&bob_token)
        .send()
        .await
        .expect("history")
        .json::<Value>()
        .await
        .expect("history json");
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["body"], "hi");
    assert_eq!(history[0]["sequence"], 1);
    assert_eq!(history[0]["sender"], "alice@x.com");

    // 房间列表：alice 的私聊以对端显示名标注
    let rooms = client
        .get(app.http("/api/v1/rooms"))
        .bearer_auth(&alice_token)
        .send()
        .await
        .expect("rooms")
        .json::<Value>()
        .await
        .expect("rooms json");
    let rooms = rooms.as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["kind"], "private");
    assert_eq!(rooms[0]["label"], "Bob");

    // bob 断开后不再接收；alice 的会话不受影响
    bob_ws.close(None).await.expect("close bob");
    sleep(Duration::from_millis(100)).await;

    send_event(
        &mut alice_ws,
        json!({"type": "send", "room_id": room_id, "body": "still here"}),
    )
    .await;
    let first = next_event(&mut alice_ws).await;
    let second = next_event(&mut alice_ws).await;
    assert!(first["type"] == "ack" || second["type"] == "ack");
    assert!(first["type"] == "delivered" || second["type"] == "delivered");
}

#[tokio::test]
async fn websocket_upgrade_requires_valid_token() {
    let app = spawn_app().await;
    let result = connect_async(app.ws("not-a-token")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn foreign_room_operations_yield_error_events() {
    let app = spawn_app().await;
    let alice_token = app.register("alice@x.com", "Alice").await;
    let _bob_token = app.register("bob@x.com", "Bob").await;
    let carol_token = app.register("carol@x.com", "Carol").await;
    let client = Client::new();

    let created = client
        .post(app.http("/api/v1/chats"))
        .bearer_auth(&alice_token)
        .json(&json!({"peer": "bob@x.com"}))
        .send()
        .await
        .expect("create chat")
        .json::<Value>()
        .await
        .expect("chat json");
    let room_id = created["room_id"].as_str().unwrap().to_owned();

    let (mut carol_ws, _) = connect_async(app.ws(&carol_token)).await.expect("carol ws");

    // 非成员加入与发送都被拒绝，连接保持打开
    send_event(&mut carol_ws, json!({"type": "join", "room_id": room_id})).await;
    let rejected = next_event(&mut carol_ws).await;
    assert_eq!(rejected["type"], "error");
    assert_eq!(rejected["code"], "FORBIDDEN");

    send_event(
        &mut carol_ws,
        json!({"type": "send", "room_id": room_id, "body": "let me in"}),
    )
    .await;
    let rejected = next_event(&mut carol_ws).await;
    assert_eq!(rejected["type"], "error");
    assert_eq!(rejected["code"], "FORBIDDEN");

    // 被拒绝的发送没有产生日志条目
    let history = client
        .get(app.http(&format!("/api/v1/rooms/{room_id}/messages")))
        .bearer_auth(&alice_token)
        .send()
        .await
        .expect("history")
        .json::<Value>()
        .await
        .expect("history json");
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn http_error_taxonomy() {
    let app = spawn_app().await;
    let alice_token = app.register("alice@x.com", "Alice").await;
    let client = Client::new();

    // 和自己私聊
    let response = client
        .post(app.http("/api/v1/chats"))
        .bearer_auth(&alice_token)
        .json(&json!({"peer": "alice@x.com"}))
        .send()
        .await
        .expect("self chat");
    assert_eq!(response.status(), 400);
    let body = response.json::<Value>().await.expect("body");
    assert_eq!(body["code"], "SELF_CHAT");

    // 未注册的对端
    let response = client
        .post(app.http("/api/v1/chats"))
        .bearer_auth(&alice_token)
        .json(&json!({"peer": "ghost@x.com"}))
        .send()
        .await
        .expect("unknown peer");
    assert_eq!(response.status(), 404);
    assert_eq!(response.json::<Value>().await.unwrap()["code"], "UNKNOWN_USER");

    // 群成员无法解析时整个创建失败，错误携带完整名单
    let response = client
        .post(app.http("/api/v1/groups"))
        .bearer_auth(&alice_token)
        .json(&json!({"name": "team", "members": ["nobody@x.com", "ghost@x.com"]}))
        .send()
        .await
        .expect("bad group");
    assert_eq!(response.status(), 422);
    let body = response.json::<Value>().await.expect("body");
    assert_eq!(body["code"], "INVALID_MEMBERS");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("nobody@x.com") && message.contains("ghost@x.com"));

    // 没有任何部分状态
    let rooms = client
        .get(app.http("/api/v1/rooms"))
        .bearer_auth(&alice_token)
        .send()
        .await
        .expect("rooms")
        .json::<Value>()
        .await
        .expect("rooms json");
    assert!(rooms.as_array().unwrap().is_empty());

    // 缺身份
    let response = client
        .get(app.http("/api/v1/rooms"))
        .send()
        .await
        .expect("no auth");
    assert_eq!(response.status(), 401);
}
