//! End-to-end dispatch over loopback WebSocket connections.

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use serde_json::json;
use tungstenite::Message;

use courier::{
    DispatchError, HandlerError, JsonCodec, RegistryError, Server, ServiceDescription,
    SocketEndpoint,
};

use support::{Gate, TestServer, accounts_service, slow_service};

#[fixture]
fn server() -> TestServer {
    TestServer::with_services([accounts_service()])
}

#[rstest]
fn routes_requests_to_the_addressed_handler(server: TestServer) {
    let mut client = server.connect();

    let reply = client.call(r#"{"service":"accounts","method":"deposit","payload":{"amount":5}}"#);

    assert_eq!(
        reply,
        json!({"service": "accounts", "method": "deposit", "status": "ok", "result": 105})
    );
    client.close();
}

#[test]
fn handler_receives_the_exact_payload() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let recorder = ServiceDescription::builder("recorder")
        .expect("valid id")
        .method("record", move |payload: &[u8]| {
            assert_eq!(payload, br#"{"k":[1,2,3]}"#);
            seen.fetch_add(1, Ordering::SeqCst);
            Ok::<_, HandlerError>(b"true".to_vec())
        })
        .expect("register record")
        .method("other", |_payload: &[u8]| -> Result<Vec<u8>, HandlerError> {
            panic!("wrong handler invoked")
        })
        .expect("register other")
        .build();
    let server = TestServer::with_services([recorder]);
    let mut client = server.connect();

    let reply = client.call(r#"{"service":"recorder","method":"record","payload":{"k":[1,2,3]}}"#);

    assert_eq!(reply["result"], true);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn decode_failures_keep_the_connection_usable(server: TestServer) {
    let mut client = server.connect();

    let fault = client.call("this is not a request");
    assert_eq!(fault["status"], "error");
    assert_eq!(fault["error"]["kind"], "decode");
    assert!(fault.get("service").is_none());

    let reply = client.call(r#"{"service":"accounts","method":"echo","payload":"still here"}"#);
    assert_eq!(reply["result"], "still here");
}

#[rstest]
#[case::unknown_service(
    r#"{"service":"billing","method":"echo"}"#,
    "unknown_service",
    "unknown service 'billing'"
)]
#[case::unknown_method(
    r#"{"service":"accounts","method":"close"}"#,
    "unknown_method",
    "unknown method 'close' for service 'accounts'"
)]
#[case::handler_error(
    r#"{"service":"accounts","method":"withdraw"}"#,
    "handler",
    "insufficient funds"
)]
fn routing_and_handler_failures_are_distinguishable(
    server: TestServer,
    #[case] frame: &str,
    #[case] kind: &str,
    #[case] message: &str,
) {
    let mut client = server.connect();

    let reply = client.call(frame);

    assert_eq!(reply["status"], "error");
    assert_eq!(reply["error"]["kind"], kind);
    assert_eq!(reply["error"]["message"], message);
}

#[rstest]
fn replies_arrive_in_request_order(server: TestServer) {
    let mut client = server.connect();

    for sequence in 0..50 {
        client.send_text(&format!(
            r#"{{"service":"accounts","method":"echo","payload":{sequence}}}"#
        ));
    }
    for sequence in 0..50 {
        let reply: serde_json::Value =
            serde_json::from_str(&client.recv_text()).expect("reply is JSON");
        assert_eq!(reply["result"], sequence);
    }
}

#[test]
fn blocked_handler_does_not_delay_other_connections() {
    let gate = Gate::default();
    let server = TestServer::with_services([accounts_service(), slow_service(gate.clone())]);
    let mut blocked = server.connect();
    let mut free = server.connect();

    blocked.send_text(r#"{"service":"slow","method":"hold"}"#);
    let started = Instant::now();
    let reply = free.call(r#"{"service":"accounts","method":"echo","payload":"fast"}"#);
    assert_eq!(reply["result"], "fast");
    assert!(started.elapsed() < Duration::from_secs(2));

    gate.open();
    let released: serde_json::Value =
        serde_json::from_str(&blocked.recv_text()).expect("reply is JSON");
    assert_eq!(released["result"], "released");
}

#[rstest]
fn closing_one_connection_leaves_the_server_running(server: TestServer) {
    let first = server.connect();
    let mut second = server.connect();
    first.close();

    let dropped = server.connect();
    drop(dropped);

    let reply = second.call(r#"{"service":"accounts","method":"echo","payload":1}"#);
    assert_eq!(reply["result"], 1);

    let mut third = server.connect();
    let reply = third.call(r#"{"service":"accounts","method":"echo","payload":2}"#);
    assert_eq!(reply["result"], 2);
}

#[rstest]
fn unencodable_results_produce_a_plaintext_error(server: TestServer) {
    let mut client = server.connect();

    client.send_text(r#"{"service":"accounts","method":"export"}"#);
    let reply = client.recv_text();

    assert!(
        reply.starts_with("error: failed to encode response: "),
        "unexpected reply: {reply}"
    );
    let next = client.call(r#"{"service":"accounts","method":"echo","payload":null}"#);
    assert_eq!(next["status"], "ok");
}

#[rstest]
fn binary_requests_are_answered_in_binary(server: TestServer) {
    let mut client = server.connect();

    client.send_binary(br#"{"service":"accounts","method":"echo","payload":[true]}"#);

    match client.recv() {
        Message::Binary(bytes) => {
            let reply: serde_json::Value = serde_json::from_slice(&bytes).expect("reply is JSON");
            assert_eq!(reply["result"], json!([true]));
        }
        other => panic!("expected binary frame, got {other:?}"),
    }
}

#[test]
fn oversized_frames_close_only_their_connection() {
    let settings = courier::ServerSettings::default().with_max_frame_bytes(256);
    let mut server = Server::with_settings(JsonCodec, settings);
    server
        .register_service(accounts_service())
        .expect("register accounts");
    let server = TestServer::start(server);
    let mut greedy = server.connect();
    let mut polite = server.connect();

    let padding = "x".repeat(1024);
    greedy.send_text(&format!(
        r#"{{"service":"accounts","method":"echo","payload":"{padding}"}}"#
    ));
    let rejected = loop {
        match greedy.try_recv() {
            Some(Message::Close(_)) | None => break true,
            Some(_) => {}
        }
    };
    assert!(rejected);

    let reply = polite.call(r#"{"service":"accounts","method":"echo","payload":"ok"}"#);
    assert_eq!(reply["result"], "ok");
}

#[test]
fn duplicate_services_are_rejected_and_the_first_kept() {
    let mut server = Server::new(JsonCodec);
    server
        .register_service(accounts_service())
        .expect("first registration");
    let impostor = ServiceDescription::builder("accounts")
        .expect("valid id")
        .method("echo", |_payload: &[u8]| Ok::<_, HandlerError>(b"\"impostor\"".to_vec()))
        .expect("register echo")
        .build();

    let error = server.register_service(impostor).expect_err("duplicate");
    assert!(matches!(error, RegistryError::DuplicateService { .. }));
    assert_eq!(
        server.service("accounts").expect("registered").len(),
        accounts_service().len()
    );
    assert!(matches!(
        server.service("billing"),
        Err(DispatchError::UnknownService { .. })
    ));

    let server = TestServer::start(server);
    let mut client = server.connect();
    let reply = client.call(r#"{"service":"accounts","method":"echo","payload":"original"}"#);
    assert_eq!(reply["result"], "original");
}

#[test]
fn serve_returns_once_shut_down() {
    let mut server = Server::new(JsonCodec);
    server
        .register_service(accounts_service())
        .expect("register accounts");
    let handle = server
        .start(&SocketEndpoint::tcp("127.0.0.1", 0))
        .expect("start server");
    let trigger = handle.shutdown_trigger();
    let url = handle.websocket_url().expect("tcp url");
    assert!(url.starts_with("ws://127.0.0.1:"));

    let joiner = thread::spawn(move || handle.join());
    trigger.trigger();

    joiner
        .join()
        .expect("join thread")
        .expect("server stopped cleanly");
}

#[cfg(unix)]
#[test]
fn serves_unix_socket_endpoints() {
    use std::os::unix::net::UnixStream;

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("run").join("courier.sock");
    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path").to_owned());
    let mut server = Server::new(JsonCodec);
    server
        .register_service(accounts_service())
        .expect("register accounts");
    let handle = server.start(&endpoint).expect("start server");
    assert!(handle.local_addr().is_none());

    let stream = UnixStream::connect(&path).expect("connect unix client");
    let (mut socket, _) =
        tungstenite::client("ws://localhost/", stream).expect("client handshake");
    socket
        .send(Message::text(
            r#"{"service":"accounts","method":"echo","payload":"unix"}"#.to_owned(),
        ))
        .expect("send request");
    let Message::Text(reply) = socket.read().expect("read reply") else {
        panic!("expected text reply");
    };
    assert!(reply.as_str().contains("\"result\":\"unix\""));
    drop(socket);

    handle.shutdown();
    handle.join().expect("join server");
    assert!(!path.exists(), "socket file removed on shutdown");
}
