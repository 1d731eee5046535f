//! SSH/SFTP remote session backed by `ssh2`.
//!
//! `ssh2` is blocking, so every call runs inside `spawn_blocking`.

use super::{CommandOutput, RemoteSession};
use crate::error::TransportError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use ssh2::{Session, Sftp};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause between polls of a channel with nothing to read.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// SSH authentication method
#[derive(Debug, Clone)]
pub enum SshAuth {
    /// Password authentication
    Password(SecretString),

    /// Public key authentication with a private key file
    KeyFile {
        key_path: PathBuf,
        passphrase: Option<SecretString>,
    },

    /// Identities offered by the running SSH agent
    Agent,
}

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: SshAuth,
    pub connect_timeout: Duration,
}

impl SshTarget {
    pub fn new(host: impl Into<String>, username: impl Into<String>, auth: SshAuth) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth,
            connect_timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

/// A connected SSH session with an SFTP channel for file transfer.
pub struct SshSession {
    endpoint: String,
    session: Arc<Session>,
    sftp: Arc<Sftp>,
    connected: Arc<AtomicBool>,
}

impl SshSession {
    /// Connect, authenticate and open the SFTP channel.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Connect` when the host is unreachable or the
    /// handshake fails, and `TransportError::Auth` when authentication is rejected.
    pub async fn connect(target: SshTarget) -> Result<Self, TransportError> {
        tokio::task::spawn_blocking(move || Self::connect_blocking(&target))
            .await
            .map_err(|e| TransportError::Exec(format!("Task join error: {e}")))?
    }

    fn connect_blocking(target: &SshTarget) -> Result<Self, TransportError> {
        let endpoint = target.endpoint();
        let connect_err = |message: String| TransportError::Connect {
            endpoint: endpoint.clone(),
            message,
        };

        let addr: SocketAddr = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|e| connect_err(format!("Cannot resolve host: {e}")))?
            .next()
            .ok_or_else(|| connect_err("Host resolved to no addresses".to_string()))?;

        let tcp = TcpStream::connect_timeout(&addr, target.connect_timeout)
            .map_err(|e| connect_err(e.to_string()))?;

        let mut session =
            Session::new().map_err(|e| connect_err(format!("Failed to create session: {e}")))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(target.connect_timeout.as_millis()).unwrap_or(u32::MAX));
        session
            .handshake()
            .map_err(|e| connect_err(format!("Handshake failed: {e}")))?;

        authenticate(&session, &target.username, &target.auth)?;

        if !session.authenticated() {
            return Err(TransportError::Auth("Authentication failed".to_string()));
        }

        // Commands and transfers carry their own timeouts through GuardedSession.
        session.set_timeout(0);

        let sftp = session
            .sftp()
            .map_err(|e| connect_err(format!("Failed to open SFTP channel: {e}")))?;

        info!("Connected to {endpoint}");

        Ok(Self {
            endpoint,
            session: Arc::new(session),
            sftp: Arc::new(sftp),
            connected: Arc::new(AtomicBool::new(true)),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

fn authenticate(session: &Session, username: &str, auth: &SshAuth) -> Result<(), TransportError> {
    match auth {
        SshAuth::Password(password) => session
            .userauth_password(username, password.expose_secret())
            .map_err(|e| TransportError::Auth(format!("Password authentication failed: {e}"))),
        SshAuth::KeyFile {
            key_path,
            passphrase,
        } => {
            let pass = passphrase.as_ref().map(|p| p.expose_secret());
            session
                .userauth_pubkey_file(username, None, key_path, pass)
                .map_err(|e| TransportError::Auth(format!("Key file authentication failed: {e}")))
        }
        SshAuth::Agent => session
            .userauth_agent(username)
            .map_err(|e| TransportError::Auth(format!("Agent authentication failed: {e}"))),
    }
}

/// Read stdout and stderr together until the remote side closes both.
///
/// Reading one stream to the end first can deadlock: the remote command
/// blocks once the other stream fills the channel window. Both readers must
/// be non-blocking.
fn drain_streams<O, E>(
    stdout: &mut O,
    stderr: &mut E,
    eof: impl Fn() -> bool,
) -> io::Result<(String, String)>
where
    O: Read,
    E: Read,
{
    let mut out = Vec::new();
    let mut err = Vec::new();
    let mut buffer = [0u8; 8192];

    loop {
        let progressed = read_available(stdout, &mut buffer, &mut out)?
            | read_available(stderr, &mut buffer, &mut err)?;
        if !progressed {
            if eof() {
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    Ok((
        String::from_utf8_lossy(&out).into_owned(),
        String::from_utf8_lossy(&err).into_owned(),
    ))
}

/// Append whatever `reader` has ready to `sink`. Returns whether anything was read.
fn read_available(
    reader: &mut impl Read,
    buffer: &mut [u8],
    sink: &mut Vec<u8>,
) -> io::Result<bool> {
    match reader.read(buffer) {
        Ok(0) => Ok(false),
        Ok(n) => {
            sink.extend_from_slice(&buffer[..n]);
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
        Err(e) => Err(e),
    }
}

fn join_error(e: &tokio::task::JoinError) -> TransportError {
    TransportError::Exec(format!("Task join error: {e}"))
}

#[async_trait]
impl RemoteSession for SshSession {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError> {
        self.ensure_connected()?;
        debug!("Sending command: {command}");

        let session = self.session.clone();
        let command = command.to_string();

        tokio::task::spawn_blocking(move || -> Result<CommandOutput, TransportError> {
            let exec_err = |e: ssh2::Error| TransportError::Exec(e.to_string());

            let mut channel = session.channel_session().map_err(exec_err)?;
            channel.exec(&command).map_err(exec_err)?;

            session.set_blocking(false);
            let drained = drain_streams(
                &mut channel.stream(0),
                &mut channel.stderr(),
                || channel.eof(),
            );
            session.set_blocking(true);
            let (stdout, stderr) = drained?;

            channel.wait_close().map_err(exec_err)?;
            let exit_status = channel.exit_status().map_err(exec_err)?;

            if exit_status != 0 {
                warn!("Command exited with status {exit_status}: {command}");
            }

            Ok(CommandOutput {
                exit_status,
                stdout,
                stderr,
            })
        })
        .await
        .map_err(|e| join_error(&e))?
    }

    async fn download(&self, remote_path: &str) -> Result<Vec<u8>, TransportError> {
        self.ensure_connected()?;
        debug!("Downloading {remote_path}");

        let sftp = self.sftp.clone();
        let path = remote_path.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<u8>, TransportError> {
            let transfer_err = |message: String| TransportError::Transfer {
                path: path.clone(),
                message,
            };

            let mut file = sftp
                .open(Path::new(&path))
                .map_err(|e| transfer_err(format!("Failed to open file: {e}")))?;

            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)
                .map_err(|e| transfer_err(e.to_string()))?;
            Ok(buffer)
        })
        .await
        .map_err(|e| join_error(&e))?
    }

    async fn upload(&self, data: &[u8], remote_path: &str) -> Result<(), TransportError> {
        self.ensure_connected()?;
        debug!("Uploading {} bytes to {remote_path}", data.len());

        let sftp = self.sftp.clone();
        let path = remote_path.to_string();
        let data = data.to_vec();

        tokio::task::spawn_blocking(move || -> Result<(), TransportError> {
            let transfer_err = |message: String| TransportError::Transfer {
                path: path.clone(),
                message,
            };

            let mut file = sftp
                .create(Path::new(&path))
                .map_err(|e| transfer_err(format!("Failed to create file: {e}")))?;

            file.write_all(&data)
                .map_err(|e| transfer_err(e.to_string()))?;
            file.flush().map_err(|e| transfer_err(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| join_error(&e))?
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let session = self.session.clone();
        let endpoint = self.endpoint.clone();

        tokio::task::spawn_blocking(move || -> Result<(), TransportError> {
            session
                .disconnect(None, "rigctl disconnect", None)
                .map_err(|e| TransportError::Exec(e.to_string()))?;
            info!("Disconnected from {endpoint}");
            Ok(())
        })
        .await
        .map_err(|e| join_error(&e))?
    }
}
