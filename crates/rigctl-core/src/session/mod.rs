//! Remote session capability used by the motion controller and the registry.
//!
//! A session runs command strings on the robot host and moves whole files
//! to and from it. [`SshSession`] is the production implementation;
//! [`GuardedSession`] adds per-session serialization and a per-call timeout
//! around any implementation.

mod ssh;

pub use ssh::{SshAuth, SshSession, SshTarget};

use crate::error::TransportError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Exit status and captured text of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn new(exit_status: i32, stdout: impl Into<String>) -> Self {
        Self {
            exit_status,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// Stdout without surrounding whitespace and trailing newline.
    #[must_use]
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }
}

/// An established channel to the robot host.
///
/// Implementations report transport-level failures only; a command that ran
/// and exited non-zero is a successful `execute` with a non-zero status.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Whether the underlying connection is still usable.
    fn is_connected(&self) -> bool;

    /// Run `command` on the remote host and capture its output.
    async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError>;

    /// Read the whole remote file at `remote_path`.
    async fn download(&self, remote_path: &str) -> Result<Vec<u8>, TransportError>;

    /// Replace the remote file at `remote_path` with `data`.
    async fn upload(&self, data: &[u8], remote_path: &str) -> Result<(), TransportError>;

    /// Close the connection. Later calls fail with `NotConnected`.
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Serializes access to a session and bounds every call with a timeout.
///
/// The command-execution and file-transfer primitives are not reentrant, so
/// concurrent callers queue on an async mutex. A call that exceeds the
/// timeout fails with `TransportError::Timeout`. The abandoned work may still
/// be running on the remote side, so the session is retired: every later call
/// fails with `TransportError::NotConnected` until the caller reconnects.
pub struct GuardedSession<S> {
    inner: S,
    lock: Mutex<()>,
    timeout: Duration,
    expired: AtomicBool,
}

impl<S: RemoteSession> GuardedSession<S> {
    #[must_use]
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
            timeout,
            expired: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a call timed out and the session was retired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    async fn guarded<T, F>(&self, operation: &'static str, call: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>> + Send,
    {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let _guard = self.lock.lock().await;
        // A queued caller may have waited behind the call that expired.
        if self.is_expired() {
            return Err(TransportError::NotConnected);
        }
        debug!("Session {operation} (timeout {:?})", self.timeout);

        if let Ok(result) = tokio::time::timeout(self.timeout, call).await {
            result
        } else {
            self.expired.store(true, Ordering::SeqCst);
            warn!(
                "Session {operation} timed out after {:?}; session retired",
                self.timeout
            );
            Err(TransportError::Timeout {
                operation,
                after: self.timeout,
            })
        }
    }
}

#[async_trait]
impl<S: RemoteSession> RemoteSession for GuardedSession<S> {
    fn is_connected(&self) -> bool {
        !self.is_expired() && self.inner.is_connected()
    }

    async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError> {
        self.guarded("execute", self.inner.execute(command)).await
    }

    async fn download(&self, remote_path: &str) -> Result<Vec<u8>, TransportError> {
        self.guarded("download", self.inner.download(remote_path))
            .await
    }

    async fn upload(&self, data: &[u8], remote_path: &str) -> Result<(), TransportError> {
        self.guarded("upload", self.inner.upload(data, remote_path))
            .await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let _guard = self.lock.lock().await;
        self.inner.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_success() {
        assert!(CommandOutput::new(0, "").success());
        assert!(!CommandOutput::new(1, "").success());
    }

    #[test]
    fn test_command_output_text_trims() {
        let out = CommandOutput::new(0, "  87.5\n");
        assert_eq!(out.text(), "87.5");
    }
}
