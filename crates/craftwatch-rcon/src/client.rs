use std::future::Future;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use craftwatch_types::PlayerList;

use crate::command::sanitize_command;
use crate::error::RconError;
use crate::list::parse_list_response;
use crate::packet::{MAX_COMMAND_BYTES, Packet, PacketKind};

/// Vanilla `rcon.port`
pub const DEFAULT_RCON_PORT: u16 = 25575;

/// Where and how to reach the server console
#[derive(Clone, Debug)]
pub struct RconConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Bound on connecting and on each request/reply exchange
    pub timeout: Duration,
}

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_RCON_PORT,
            password: String::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// An authenticated RCON connection
pub struct RconClient {
    stream: TcpStream,
    next_id: i32,
    timeout: Duration,
}

impl RconClient {
    /// Connect and log in
    pub async fn connect(config: &RconConfig) -> Result<Self, RconError> {
        info!(host = %config.host, port = config.port, "connecting to RCON");
        let stream = with_timeout(
            config.timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await??;

        let mut client = Self {
            stream,
            next_id: 1,
            timeout: config.timeout,
        };
        client.authenticate(&config.password).await?;
        info!("RCON connected");
        Ok(client)
    }

    async fn authenticate(&mut self, password: &str) -> Result<(), RconError> {
        let id = self.next_request_id();
        self.write_packet(&Packet::new(id, PacketKind::AUTH, password)).await?;

        loop {
            let reply = self.read_packet().await?;
            // Some servers send an empty RESPONSE_VALUE ahead of the auth reply
            if reply.kind != PacketKind::AUTH_RESPONSE {
                continue;
            }
            if reply.id == -1 {
                return Err(RconError::AuthFailed);
            }
            if reply.id != id {
                return Err(RconError::Protocol(format!(
                    "auth reply for request {} while waiting for {id}",
                    reply.id
                )));
            }
            return Ok(());
        }
    }

    /// Run a console command and return the server's raw reply.
    ///
    /// A leading `/` is stripped first.
    pub async fn send_command(&mut self, command: &str) -> Result<String, RconError> {
        let command = sanitize_command(command)?;
        if command.len() > MAX_COMMAND_BYTES {
            return Err(RconError::PayloadTooLarge {
                len: command.len(),
                max: MAX_COMMAND_BYTES,
            });
        }

        debug!(%command, "sending RCON command");
        let id = self.next_request_id();
        self.write_packet(&Packet::new(id, PacketKind::EXEC_COMMAND, command))
            .await?;

        let reply = self.read_packet().await?;
        if reply.id != id {
            return Err(RconError::Protocol(format!(
                "reply for request {} while waiting for {id}",
                reply.id
            )));
        }
        debug!(response = %reply.body, "raw RCON response");
        Ok(reply.body)
    }

    /// Run `list` and parse the reply
    pub async fn list_players(&mut self) -> Result<PlayerList, RconError> {
        let response = self.send_command("list").await?;
        parse_list_response(&response)
    }

    /// Close the connection
    pub async fn disconnect(mut self) -> Result<(), RconError> {
        self.stream.shutdown().await?;
        info!("RCON connection closed");
        Ok(())
    }

    fn next_request_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        id
    }

    async fn write_packet(&mut self, packet: &Packet) -> Result<(), RconError> {
        let bytes = packet.encode();
        with_timeout(self.timeout, self.stream.write_all(&bytes)).await??;
        Ok(())
    }

    async fn read_packet(&mut self) -> Result<Packet, RconError> {
        with_timeout(self.timeout, Packet::read_from(&mut self.stream)).await?
    }
}

async fn with_timeout<F: Future>(timeout: Duration, fut: F) -> Result<F::Output, RconError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| RconError::Timeout(timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Minimal console server: checks the password, answers `list`, echoes
    /// anything else.
    async fn spawn_server(password: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let auth = Packet::read_from(&mut socket).await.unwrap();
            assert_eq!(auth.kind, PacketKind::AUTH);
            let id = if auth.body == password { auth.id } else { -1 };
            socket
                .write_all(&Packet::new(auth.id, PacketKind::RESPONSE_VALUE, "").encode())
                .await
                .unwrap();
            socket
                .write_all(&Packet::new(id, PacketKind::AUTH_RESPONSE, "").encode())
                .await
                .unwrap();
            if id == -1 {
                return;
            }

            while let Ok(request) = Packet::read_from(&mut socket).await {
                let body = match request.body.as_str() {
                    "list" => list_reply(),
                    other => format!("ran {other}"),
                };
                socket
                    .write_all(&Packet::new(request.id, PacketKind::RESPONSE_VALUE, body).encode())
                    .await
                    .unwrap();
            }
        });

        port
    }

    fn list_reply() -> String {
        "There are 1 of a max of 20 players online: Alice".to_string()
    }

    fn config(port: u16, password: &str) -> RconConfig {
        RconConfig {
            host: "127.0.0.1".to_string(),
            port,
            password: password.to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_command_round_trip() {
        let port = spawn_server("hunter2").await;
        let mut client = RconClient::connect(&config(port, "hunter2")).await.unwrap();

        assert_eq!(client.send_command("/say hi").await.unwrap(), "ran say hi");

        let list = client.list_players().await.unwrap();
        assert_eq!(list.player_count, 1);
        assert_eq!(list.players, vec!["Alice"]);

        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let port = spawn_server("hunter2").await;
        let result = RconClient::connect(&config(port, "nope")).await;
        assert!(matches!(result, Err(RconError::AuthFailed)));
    }

    #[tokio::test]
    async fn test_oversized_command_is_not_sent() {
        let port = spawn_server("pw").await;
        let mut client = RconClient::connect(&config(port, "pw")).await.unwrap();

        let huge = "a".repeat(MAX_COMMAND_BYTES + 1);
        assert!(matches!(
            client.send_command(&huge).await,
            Err(RconError::PayloadTooLarge { .. })
        ));
        assert!(matches!(
            client.send_command("  ").await,
            Err(RconError::EmptyCommand)
        ));
        // connection is still usable
        assert_eq!(client.send_command("time set day").await.unwrap(), "ran time set day");
    }

    #[tokio::test]
    async fn test_only_one_leading_slash_is_stripped() {
        let port = spawn_server("pw").await;
        let mut client = RconClient::connect(&config(port, "pw")).await.unwrap();

        assert_eq!(client.send_command("//wand").await.unwrap(), "ran /wand");
        assert_eq!(client.send_command("/list").await.unwrap(), list_reply());
    }
}
