//! Loopback server and WebSocket client shared by the integration suites.

use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tungstenite::{Message, WebSocket};

use courier::{
    HandlerError, JsonCodec, JsonMethod, Server, ServerHandle, ServiceDescription, SocketEndpoint,
};

pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Running server bound to an ephemeral loopback port.
pub struct TestServer {
    handle: Option<ServerHandle>,
    addr: SocketAddr,
}

impl TestServer {
    pub fn start(server: Server) -> Self {
        let handle = server
            .start(&SocketEndpoint::tcp("127.0.0.1", 0))
            .expect("start server");
        let addr = handle.local_addr().expect("tcp listener address");
        Self {
            handle: Some(handle),
            addr,
        }
    }

    pub fn with_services(services: impl IntoIterator<Item = ServiceDescription>) -> Self {
        let mut server = Server::new(JsonCodec);
        for service in services {
            server.register_service(service).expect("register service");
        }
        Self::start(server)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn connect(&self) -> Client {
        Client::connect(self.addr)
    }

    pub fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
            handle.join().expect("join server");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
            let _ = handle.join();
        }
    }
}

/// Blocking WebSocket client with a bounded read timeout.
pub struct Client {
    socket: WebSocket<TcpStream>,
}

impl Client {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect client");
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .expect("set read timeout");
        let (socket, _) =
            tungstenite::client(format!("ws://{addr}/"), stream).expect("client handshake");
        Self { socket }
    }

    pub fn send_text(&mut self, frame: &str) {
        self.socket
            .send(Message::text(frame.to_owned()))
            .expect("send text frame");
    }

    pub fn send_binary(&mut self, frame: &[u8]) {
        self.socket
            .send(Message::binary(frame.to_vec()))
            .expect("send binary frame");
    }

    /// Next data frame, skipping control frames.
    pub fn recv(&mut self) -> Message {
        loop {
            match self.socket.read().expect("read frame") {
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                message => return message,
            }
        }
    }

    /// Next frame of any kind, or `None` once the connection has failed.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.socket.read().ok()
    }

    pub fn recv_text(&mut self) -> String {
        match self.recv() {
            Message::Text(text) => text.as_str().to_owned(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    /// Sends `frame` and parses the JSON reply.
    pub fn call(&mut self, frame: &str) -> Value {
        self.send_text(frame);
        let reply = self.recv_text();
        serde_json::from_str(&reply).unwrap_or_else(|error| panic!("reply {reply} is not JSON: {error}"))
    }

    /// Performs the close handshake and waits for the server to finish it.
    pub fn close(mut self) {
        self.socket.close(None).expect("send close frame");
        while self.socket.read().is_ok() {}
    }
}

/// One-shot latch used to hold a handler open.
#[derive(Clone, Default)]
pub struct Gate {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn open(&self) {
        let (lock, condvar) = &*self.state;
        *lock.lock().expect("gate lock") = true;
        condvar.notify_all();
    }

    pub fn wait(&self) {
        let (lock, condvar) = &*self.state;
        let mut open = lock.lock().expect("gate lock");
        while !*open {
            open = condvar.wait(open).expect("gate wait");
        }
    }
}

#[derive(Deserialize)]
struct Deposit {
    amount: u64,
}

/// `accounts` service exercising every reply shape.
pub fn accounts_service() -> ServiceDescription {
    ServiceDescription::builder("accounts")
        .expect("valid id")
        .method("echo", |payload: &[u8]| Ok::<_, HandlerError>(payload.to_vec()))
        .expect("register echo")
        .method(
            "deposit",
            JsonMethod::new(|deposit: Deposit| Ok::<_, HandlerError>(deposit.amount + 100)),
        )
        .expect("register deposit")
        .method("withdraw", |_payload: &[u8]| {
            Err::<Vec<u8>, _>(HandlerError::new("insufficient funds"))
        })
        .expect("register withdraw")
        .method("export", |_payload: &[u8]| Ok::<_, HandlerError>(b"csv,not,json".to_vec()))
        .expect("register export")
        .build()
}

/// `slow` service whose `hold` method blocks until `gate` opens.
pub fn slow_service(gate: Gate) -> ServiceDescription {
    ServiceDescription::builder("slow")
        .expect("valid id")
        .method("hold", move |_payload: &[u8]| {
            gate.wait();
            Ok::<_, HandlerError>(b"\"released\"".to_vec())
        })
        .expect("register hold")
        .build()
}
