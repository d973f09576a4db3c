//! Scripted SMTP peer on a loopback port.
//!
//! Answers the probe dialogue line by line and records what it saw, so tests
//! can check both the verdict and that the session was closed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone, Copy)]
pub enum SmtpScript {
    /// Normal dialogue; RCPT is answered with this reply line
    Rcpt(&'static str),
    /// Like `Rcpt`, but EHLO is refused and only HELO is understood
    HeloOnly(&'static str),
    /// Accept the connection and never say anything
    Silent,
}

#[derive(Clone)]
pub struct SmtpStub {
    pub port: u16,
    recipients: Arc<Mutex<Vec<String>>>,
    commands: Arc<Mutex<Vec<String>>>,
    quits: Arc<AtomicUsize>,
}

impl SmtpStub {
    pub async fn spawn(script: SmtpScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind SMTP stub");
        let port = listener.local_addr().expect("No local address").port();

        let stub = Self {
            port,
            recipients: Arc::new(Mutex::new(Vec::new())),
            commands: Arc::new(Mutex::new(Vec::new())),
            quits: Arc::new(AtomicUsize::new(0)),
        };

        let session_stub = stub.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let stub = session_stub.clone();
                tokio::spawn(async move {
                    let _ = stub.session(socket, script).await;
                });
            }
        });

        stub
    }

    /// Addresses given in RCPT TO, in arrival order.
    pub fn recipients(&self) -> Vec<String> {
        self.recipients.lock().unwrap().clone()
    }

    /// Every command line received, across sessions, in arrival order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Number of sessions that ended with QUIT.
    pub fn quit_count(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    async fn session(&self, socket: TcpStream, script: SmtpScript) -> std::io::Result<()> {
        let (rcpt_reply, ehlo_supported) = match script {
            SmtpScript::Rcpt(reply) => (reply, true),
            SmtpScript::HeloOnly(reply) => (reply, false),
            SmtpScript::Silent => {
                // Hold the socket open until the client gives up.
                let mut reader = BufReader::new(socket);
                let mut line = String::new();
                while reader.read_line(&mut line).await? > 0 {
                    line.clear();
                }
                return Ok(());
            }
        };

        let (read_half, mut write_half) = socket.into_split();
        let mut reader = BufReader::new(read_half);

        write_half
            .write_all(b"220-stub.test ESMTP\r\n220 ready\r\n")
            .await?;

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(());
            }
            let command = line.trim_end().to_string();
            self.commands.lock().unwrap().push(command.clone());
            let verb = command
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_ascii_uppercase();

            let reply = match verb.as_str() {
                "EHLO" if !ehlo_supported => "502 5.5.2 EHLO not supported\r\n".to_string(),
                "EHLO" => "250-stub.test\r\n250 8BITMIME\r\n".to_string(),
                "HELO" => "250 stub.test\r\n".to_string(),
                "MAIL" => "250 2.1.0 Ok\r\n".to_string(),
                "RCPT" => {
                    let recipient = command
                        .split_once(':')
                        .map(|(_, rest)| rest.trim().trim_matches(|c| c == '<' || c == '>'))
                        .unwrap_or_default()
                        .to_string();
                    self.recipients.lock().unwrap().push(recipient);
                    format!("{}\r\n", rcpt_reply)
                }
                "RSET" | "NOOP" => "250 2.0.0 Ok\r\n".to_string(),
                "QUIT" => {
                    self.quits.fetch_add(1, Ordering::SeqCst);
                    write_half.write_all(b"221 2.0.0 Bye\r\n").await?;
                    return Ok(());
                }
                _ => "502 5.5.2 Command not recognized\r\n".to_string(),
            };
            write_half.write_all(reply.as_bytes()).await?;
        }
    }
}

/// A loopback port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    let port = listener.local_addr().expect("No local address").port();
    drop(listener);
    port
}
