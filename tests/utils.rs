//! Shared helpers for integration tests: an in-process server on an
//! ephemeral port and a raw RESP test client.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tidekv::config::ServerConfig;
use tidekv::connection::handle_client_connection;
use tidekv::input::read_rdb_frame;
use tidekv::resp::RespValue;
use tidekv::server::ServerContext;

/// Starts a server on an ephemeral port, returning its shared context and
/// address. `extra_args` are appended to the command line.
pub async fn start_server(extra_args: &[&str]) -> (Arc<ServerContext>, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let mut args = vec![
        "tidekv".to_string(),
        "--port".to_string(),
        address.port().to_string(),
    ];
    args.extend(extra_args.iter().map(|s| s.to_string()));

    let context = ServerContext::new(ServerConfig::from_args(args).unwrap());
    let accept_context = Arc::clone(&context);

    tokio::spawn(async move {
        loop {
            if let Ok((stream, peer)) = listener.accept().await {
                let connection_context = Arc::clone(&accept_context);

                tokio::spawn(async move {
                    handle_client_connection(stream, peer.to_string(), connection_context).await;
                });
            }
        }
    });

    (context, address)
}

/// A raw RESP client over a real TCP connection.
pub struct TestClient {
    stream: TcpStream,
    buffer: BytesMut,
}

impl TestClient {
    pub async fn connect(address: SocketAddr) -> Self {
        TestClient {
            stream: TcpStream::connect(address).await.unwrap(),
            buffer: BytesMut::new(),
        }
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    pub async fn send(&mut self, parts: &[&str]) {
        let encoded = RespValue::command(parts).encode();
        self.send_raw(&encoded).await;
    }

    /// Reads one full RESP frame and returns its exact wire bytes.
    pub async fn read_reply_raw(&mut self) -> Vec<u8> {
        loop {
            if let Some((_, consumed)) = RespValue::decode(&self.buffer[..]).unwrap() {
                let raw = self.buffer[..consumed].to_vec();
                self.buffer.advance(consumed);
                return raw;
            }

            let bytes_read = self.stream.read_buf(&mut self.buffer).await.unwrap();
            assert!(bytes_read > 0, "connection closed while waiting for a reply");
        }
    }

    /// Reads one full RESP frame, expecting its wire form to be valid text.
    pub async fn read_reply(&mut self) -> String {
        String::from_utf8(self.read_reply_raw().await).unwrap()
    }

    pub async fn roundtrip(&mut self, parts: &[&str]) -> String {
        self.send(parts).await;
        self.read_reply().await
    }

    /// Reads the snapshot frame a leader sends after `FULLRESYNC`.
    pub async fn read_snapshot(&mut self) -> Vec<u8> {
        read_rdb_frame(&mut self.stream, &mut self.buffer)
            .await
            .unwrap()
    }

    /// Performs the replica side of the replication handshake, leaving the
    /// connection promoted on the server side.
    pub async fn handshake_as_replica(&mut self, listening_port: u16) {
        assert_eq!(self.roundtrip(&["PING"]).await, "+PONG\r\n");
        assert_eq!(
            self.roundtrip(&["REPLCONF", "listening-port", &listening_port.to_string()])
                .await,
            "+OK\r\n"
        );
        assert_eq!(
            self.roundtrip(&["REPLCONF", "capa", "psync2"]).await,
            "+OK\r\n"
        );

        let fullresync = self.roundtrip(&["PSYNC", "?", "-1"]).await;
        assert!(
            fullresync.starts_with("+FULLRESYNC "),
            "unexpected PSYNC reply: {}",
            fullresync
        );

        let snapshot = self.read_snapshot().await;
        assert!(snapshot.starts_with(b"REDIS"));
    }
}
