//! Mailbox verification via MX lookup and an SMTP RCPT probe.
//!
//! One session per call: greeting, HELO, MAIL FROM, RCPT TO, QUIT. No
//! message is ever sent. Only an exact `250` reply to RCPT counts as valid;
//! every other reply or failure is invalid. The richer
//! [`VerificationOutcome`] is kept for logs and progress lines.

use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use lettre::transport::smtp::commands::{Mail, Quit, Rcpt};
use lettre::transport::smtp::response::Response;
use lettre::Address;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::kernel::mx::{DNS_ATTEMPTS, DNS_TIMEOUT};
use crate::kernel::BaseMxResolver;

/// Identity sent with HELO.
pub const HELO_NAME: &str = "example.com";

/// Envelope sender used for every probe.
pub const PROBE_SENDER: &str = "test@example.com";

pub const SMTP_PORT: u16 = 25;

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    /// Always 25 in production; tests point this at a local stub peer.
    pub port: u16,
    /// Bound on connect and on each command round-trip
    pub command_timeout: Duration,
    /// Bound on the whole session
    pub session_timeout: Duration,
    /// Bound on one MX query attempt
    pub dns_timeout: Duration,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            port: SMTP_PORT,
            command_timeout: Duration::from_secs(10),
            session_timeout: Duration::from_secs(30),
            dns_timeout: DNS_TIMEOUT,
        }
    }
}

impl SmtpSettings {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }

    /// The resolver retries once, so a lookup may take every attempt.
    fn lookup_bound(&self) -> Duration {
        self.dns_timeout * DNS_ATTEMPTS as u32
    }
}

/// Why an address was or was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// RCPT answered with 250
    Valid,
    /// No `@`, empty domain, or not a usable mailbox
    MalformedAddress,
    /// Domain publishes no MX records
    NoMailExchanger,
    /// MX lookup itself failed
    DnsFailure(String),
    /// Server answered the greeting, HELO, MAIL or RCPT with something other than success
    Rejected { reply: String },
    /// TCP connect failed
    Unreachable(String),
    Timeout,
    ProtocolError(String),
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationOutcome::Valid)
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationOutcome::Valid => write!(f, "accepted"),
            VerificationOutcome::MalformedAddress => write!(f, "malformed address"),
            VerificationOutcome::NoMailExchanger => write!(f, "no mail exchanger"),
            VerificationOutcome::DnsFailure(reason) => write!(f, "DNS failure: {}", reason),
            VerificationOutcome::Rejected { reply } => write!(f, "rejected: {}", reply),
            VerificationOutcome::Unreachable(reason) => write!(f, "unreachable: {}", reason),
            VerificationOutcome::Timeout => write!(f, "timed out"),
            VerificationOutcome::ProtocolError(reason) => write!(f, "protocol error: {}", reason),
        }
    }
}

/// Verifies candidate addresses. Holds no per-call state.
#[derive(Clone)]
pub struct EmailVerifier {
    resolver: Arc<dyn BaseMxResolver>,
    settings: SmtpSettings,
}

impl EmailVerifier {
    pub fn new(resolver: Arc<dyn BaseMxResolver>, settings: SmtpSettings) -> Self {
        Self { resolver, settings }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    /// Boolean contract: true only when the probe got a 250 for RCPT.
    pub async fn verify(&self, email: &str) -> bool {
        self.check(email).await.is_valid()
    }

    pub async fn check(&self, email: &str) -> VerificationOutcome {
        let domain = match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => domain,
            _ => return VerificationOutcome::MalformedAddress,
        };
        let recipient: Address = match email.parse() {
            Ok(address) => address,
            Err(e) => {
                debug!(email = %email, error = %e, "Candidate is not a usable mailbox");
                return VerificationOutcome::MalformedAddress;
            }
        };

        let lookup = tokio::time::timeout(
            self.settings.lookup_bound(),
            self.resolver.mail_exchangers(domain),
        )
        .await;
        let exchangers = match lookup {
            Ok(Ok(exchangers)) => exchangers,
            Ok(Err(e)) => {
                debug!(email = %email, error = %e, "MX lookup failed");
                return VerificationOutcome::DnsFailure(e.to_string());
            }
            Err(_) => return VerificationOutcome::Timeout,
        };

        // first in resolver response order, no preference sorting
        let Some(host) = exchangers.into_iter().next() else {
            return VerificationOutcome::NoMailExchanger;
        };

        let probe = probe_mailbox(&host, &self.settings, recipient);
        let outcome = match tokio::time::timeout(self.settings.session_timeout, probe).await {
            Ok(outcome) => outcome,
            Err(_) => VerificationOutcome::Timeout,
        };

        info!(email = %email, mx = %host, outcome = %outcome, "SMTP probe finished");
        outcome
    }
}

/// One SMTP session. QUIT is attempted on every path once connected.
async fn probe_mailbox(
    host: &str,
    settings: &SmtpSettings,
    recipient: Address,
) -> VerificationOutcome {
    let sender: Address = match PROBE_SENDER.parse() {
        Ok(sender) => sender,
        Err(e) => return VerificationOutcome::ProtocolError(format!("bad probe sender: {}", e)),
    };

    let connect = TcpStream::connect((host, settings.port));
    let stream = match tokio::time::timeout(settings.command_timeout, connect).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return VerificationOutcome::Unreachable(e.to_string()),
        Err(_) => return VerificationOutcome::Timeout,
    };

    let (read_half, write_half) = stream.into_split();
    let mut session = SmtpSession {
        reader: BufReader::new(read_half),
        writer: write_half,
        timeout: settings.command_timeout,
    };

    let outcome = match rcpt_probe(&mut session, sender, recipient).await {
        Ok(outcome) => outcome,
        Err(e) => classify(&e),
    };

    if let Err(e) = session.send(&Quit.to_string()).await {
        // the socket is closed when the session drops
        debug!(mx = %host, error = %e, "QUIT failed, dropping connection");
    }
    outcome
}

async fn rcpt_probe(
    session: &mut SmtpSession,
    sender: Address,
    recipient: Address,
) -> io::Result<VerificationOutcome> {
    let greeting = session.read_reply().await?;
    if !greeting.is_positive() {
        return Ok(rejected(&greeting));
    }

    let hello = session.send(&format!("HELO {}\r\n", HELO_NAME)).await?;
    if !hello.is_positive() {
        return Ok(rejected(&hello));
    }

    let mail = session
        .send(&Mail::new(Some(sender), vec![]).to_string())
        .await?;
    if !mail.is_positive() {
        return Ok(rejected(&mail));
    }

    let rcpt = session
        .send(&Rcpt::new(recipient, vec![]).to_string())
        .await?;
    if rcpt.code().to_string() == "250" {
        Ok(VerificationOutcome::Valid)
    } else {
        Ok(rejected(&rcpt))
    }
}

fn rejected(response: &Response) -> VerificationOutcome {
    VerificationOutcome::Rejected {
        reply: format!(
            "{} {}",
            response.code(),
            response.message().collect::<Vec<&str>>().join(" ")
        ),
    }
}

fn classify(error: &io::Error) -> VerificationOutcome {
    match error.kind() {
        io::ErrorKind::TimedOut => VerificationOutcome::Timeout,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            VerificationOutcome::ProtocolError(error.to_string())
        }
        _ => VerificationOutcome::Unreachable(error.to_string()),
    }
}

struct SmtpSession {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    timeout: Duration,
}

impl SmtpSession {
    /// Write one command line and read its reply.
    async fn send(&mut self, command: &str) -> io::Result<Response> {
        tokio::time::timeout(self.timeout, self.writer.write_all(command.as_bytes()))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write timed out"))??;
        self.read_reply().await
    }

    /// Read a possibly multi-line reply (`250-...` continuation lines, then `250 ...`).
    async fn read_reply(&mut self) -> io::Result<Response> {
        let mut raw = String::new();
        loop {
            let mut line = String::new();
            let read = tokio::time::timeout(self.timeout, self.reader.read_line(&mut line))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "reply timed out"))??;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-reply",
                ));
            }

            let line = line.trim_end_matches(['\r', '\n']);
            raw.push_str(line);
            raw.push_str("\r\n");
            if line.as_bytes().get(3) != Some(&b'-') {
                break;
            }
        }

        Response::from_str(&raw).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("unparseable reply: {}", e))
        })
    }
}
