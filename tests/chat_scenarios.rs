//! End-to-end chat scenarios over real TCP connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};

use line_chat::{serve, Config, Room, RoomHandle};

const WAIT: Duration = Duration::from_secs(3);
const QUIET: Duration = Duration::from_millis(200);

/// Start a room and accept loop on an ephemeral port
async fn start_server(config: Config) -> (SocketAddr, RoomHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (room, handle) = Room::new(config.overflow_policy);
    tokio::spawn(room.run());
    tokio::spawn(serve(listener, handle.clone(), Arc::new(config)));

    (addr, handle)
}

/// Line-framed test client
struct TestClient {
    framed: Framed<TcpStream, LinesCodec>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            framed: Framed::new(stream, LinesCodec::new()),
        }
    }

    /// Connect, complete the handshake and wait for our own join notice
    async fn login(addr: SocketAddr, name: &str) -> Self {
        let mut client = Self::connect(addr).await;
        assert_eq!(client.recv().await, "Welcome to my Chat Server!");
        assert_eq!(client.recv().await, "Please enter your username:");
        client.send(name).await;
        assert_eq!(client.recv().await, format!("Welcome, {}", name));
        assert_eq!(client.recv().await, format!("*** {} has joined", name));
        client
    }

    async fn send(&mut self, line: &str) {
        self.framed.send(line).await.unwrap();
    }

    /// Write bytes as-is, bypassing the line encoder
    async fn send_raw(&mut self, bytes: &[u8]) {
        self.framed.get_mut().write_all(bytes).await.unwrap();
    }

    async fn recv(&mut self) -> String {
        timeout(WAIT, self.framed.next())
            .await
            .expect("timed out waiting for a line")
            .expect("connection closed")
            .expect("codec error")
    }

    async fn expect_silence(&mut self) {
        assert!(
            timeout(QUIET, self.framed.next()).await.is_err(),
            "expected no more lines"
        );
    }

    /// Read until the server closes the connection
    async fn expect_closed(&mut self) {
        timeout(WAIT, async {
            while let Some(Ok(_)) = self.framed.next().await {}
        })
        .await
        .expect("connection was not closed");
    }
}

#[tokio::test]
async fn scenario_a_first_member_sees_own_join() {
    let (addr, room) = start_server(Config::default()).await;

    let _alice = TestClient::login(addr, "alice").await;

    assert_eq!(room.members().await.unwrap(), vec!["alice"]);
}

#[tokio::test]
async fn scenario_b_two_members_chat() {
    let (addr, room) = start_server(Config::default()).await;

    let mut alice = TestClient::login(addr, "alice").await;
    let mut bob = TestClient::login(addr, "bob").await;
    assert_eq!(alice.recv().await, "*** bob has joined");

    alice.send("hello").await;
    assert_eq!(bob.recv().await, "[alice]: hello");
    assert_eq!(alice.recv().await, "[alice]: hello");

    assert_eq!(room.members().await.unwrap(), vec!["alice", "bob"]);
}

#[tokio::test]
async fn scenario_c_empty_line_is_not_broadcast() {
    let (addr, _room) = start_server(Config::default()).await;

    let mut alice = TestClient::login(addr, "alice").await;
    let mut bob = TestClient::login(addr, "bob").await;
    assert_eq!(alice.recv().await, "*** bob has joined");

    alice.send("").await;
    bob.expect_silence().await;

    alice.send("after").await;
    assert_eq!(bob.recv().await, "[alice]: after");
}

#[tokio::test]
async fn scenario_d_dropped_connection_is_announced_once() {
    let (addr, room) = start_server(Config::default()).await;

    let mut alice = TestClient::login(addr, "alice").await;
    let bob = TestClient::login(addr, "bob").await;
    assert_eq!(alice.recv().await, "*** bob has joined");

    drop(bob);
    assert_eq!(alice.recv().await, "*** bob has disconnected");
    assert_eq!(room.members().await.unwrap(), vec!["alice"]);

    room.logout("bob").unwrap();
    alice.expect_silence().await;
    assert_eq!(room.members().await.unwrap(), vec!["alice"]);
}

#[tokio::test]
async fn scenario_e_failed_login_leaves_no_trace() {
    let (addr, room) = start_server(Config::default()).await;

    let mut ghost = TestClient::connect(addr).await;
    assert_eq!(ghost.recv().await, "Welcome to my Chat Server!");
    drop(ghost);

    // Our own join is the first room line we see.
    let _alice = TestClient::login(addr, "alice").await;
    assert_eq!(room.members().await.unwrap(), vec!["alice"]);
}

#[tokio::test]
async fn sender_order_is_preserved() {
    let (addr, _room) = start_server(Config::default()).await;

    let mut alice = TestClient::login(addr, "alice").await;
    let mut bob = TestClient::login(addr, "bob").await;
    assert_eq!(alice.recv().await, "*** bob has joined");

    for i in 0..20 {
        alice.send(&format!("message {}", i)).await;
    }
    for i in 0..20 {
        assert_eq!(bob.recv().await, format!("[alice]: message {}", i));
    }
}

#[tokio::test]
async fn duplicate_name_takes_over_and_closes_previous() {
    let (addr, room) = start_server(Config::default()).await;

    let mut first = TestClient::login(addr, "alice").await;
    let mut second = TestClient::login(addr, "alice").await;

    first.expect_closed().await;
    assert_eq!(room.members().await.unwrap(), vec!["alice"]);

    // The kicked session does not log the new one out.
    second.send("still here").await;
    assert_eq!(second.recv().await, "[alice]: still here");
    assert_eq!(room.members().await.unwrap(), vec!["alice"]);
}

#[tokio::test]
async fn oversized_line_disconnects_sender() {
    let config = Config {
        max_line_length: Some(32),
        ..Config::default()
    };
    let (addr, room) = start_server(config).await;

    let mut alice = TestClient::login(addr, "alice").await;
    let mut bob = TestClient::login(addr, "bob").await;
    assert_eq!(alice.recv().await, "*** bob has joined");

    bob.send(&"x".repeat(100)).await;
    assert_eq!(alice.recv().await, "*** bob has disconnected");
    bob.expect_closed().await;
    assert_eq!(room.members().await.unwrap(), vec!["alice"]);
}

#[tokio::test]
async fn invalid_utf8_is_relayed_lossily() {
    let (addr, room) = start_server(Config::default()).await;

    let mut alice = TestClient::login(addr, "alice").await;
    let mut bob = TestClient::login(addr, "bob").await;
    assert_eq!(alice.recv().await, "*** bob has joined");

    bob.send_raw(b"caf\xe9\n").await;
    assert_eq!(alice.recv().await, "[bob]: caf\u{FFFD}");
    assert_eq!(bob.recv().await, "[bob]: caf\u{FFFD}");
    assert_eq!(room.members().await.unwrap(), vec!["alice", "bob"]);
}
