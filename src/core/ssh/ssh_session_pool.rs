//! Blocking ssh2 sessions behind an async, per-node bounded pool.
//!
//! Each node owns one slot with a single permit. A probe takes the permit and
//! hands it to the blocking task, so a session that hangs past its deadline
//! keeps the slot busy and the next cycle reports the node offline instead of
//! opening a second connection.

use std::collections::{HashMap, HashSet};
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use ssh2::{ErrorCode, Session};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::core::ssh::probe_error::ProbeError;
use crate::core::ssh::probe_transport::ProbeTransport;
use crate::core::ssh::ssh_target::SshTarget;

/// `LIBSSH2_ERROR_TIMEOUT`
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;

struct CachedSession {
    endpoint: String,
    session: Session,
}

struct NodeSlot {
    busy: Arc<Semaphore>,
    session: Mutex<Option<CachedSession>>,
}

impl NodeSlot {
    fn new() -> Self {
        Self {
            busy: Arc::new(Semaphore::new(1)),
            session: Mutex::new(None),
        }
    }

    fn cached(&self) -> MutexGuard<'_, Option<CachedSession>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs on the blocking pool.
    fn run(&self, target: &SshTarget, command: &str, timeout: Duration) -> Result<String, ProbeError> {
        let endpoint = target.endpoint();

        let reused = self.cached().take().filter(|c| c.endpoint == endpoint);
        let session = match reused {
            Some(cached) => cached.session,
            None => {
                debug!(node = %target.node_name, endpoint = %endpoint, "Opening SSH session");
                connect(target, timeout)?
            }
        };

        // On error the session is dropped here and the next cycle reconnects.
        let output = exec(&session, command, timeout)?;
        *self.cached() = Some(CachedSession { endpoint, session });
        Ok(output)
    }
}

pub struct SshSessionPool {
    slots: Mutex<HashMap<String, Arc<NodeSlot>>>,
}

impl Default for SshSessionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl SshSessionPool {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Arc<NodeSlot>>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self, node_name: &str) -> Arc<NodeSlot> {
        self.slots()
            .entry(node_name.to_string())
            .or_insert_with(|| Arc::new(NodeSlot::new()))
            .clone()
    }
}

#[async_trait]
impl ProbeTransport for SshSessionPool {
    async fn exec(
        &self,
        target: &SshTarget,
        command: &str,
        timeout: Duration,
    ) -> Result<String, ProbeError> {
        let slot = self.slot(&target.node_name);
        let permit = slot
            .busy
            .clone()
            .try_acquire_owned()
            .map_err(|_| ProbeError::SessionBusy)?;

        let target = target.clone();
        let command = command.to_string();
        let node = target.node_name.clone();

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            slot.run(&target, &command, timeout)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ProbeError::ConnectionFailed(format!(
                "probe task failed: {join_err}"
            ))),
            Err(_) => {
                warn!(node = %node, "SSH probe exceeded deadline; abandoning session");
                Err(ProbeError::Timeout(timeout))
            }
        }
    }

    fn retain_nodes(&self, names: &HashSet<String>) {
        self.slots().retain(|name, _| names.contains(name));
    }
}

fn connect(target: &SshTarget, timeout: Duration) -> Result<Session, ProbeError> {
    let addr = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| from_io(e, timeout))?
        .next()
        .ok_or_else(|| ProbeError::ConnectionFailed(format!("cannot resolve {}", target.host)))?;

    let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| from_io(e, timeout))?;

    let mut session = Session::new().map_err(|e| from_ssh(e, timeout))?;
    session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|e| from_ssh(e, timeout))?;

    match &target.key_path {
        Some(key) => session.userauth_pubkey_file(&target.user, None, key, None),
        None => session.userauth_agent(&target.user),
    }
    .map_err(|e| from_ssh(e, timeout))?;

    if !session.authenticated() {
        return Err(ProbeError::ConnectionFailed(format!(
            "authentication rejected for {}",
            target.endpoint()
        )));
    }
    Ok(session)
}

fn exec(session: &Session, command: &str, timeout: Duration) -> Result<String, ProbeError> {
    let mut channel = session.channel_session().map_err(|e| from_ssh(e, timeout))?;
    channel.exec(command).map_err(|e| from_ssh(e, timeout))?;

    let mut stdout = String::new();
    channel
        .read_to_string(&mut stdout)
        .map_err(|e| from_io(e, timeout))?;
    let mut stderr = String::new();
    channel
        .stderr()
        .read_to_string(&mut stderr)
        .map_err(|e| from_io(e, timeout))?;

    channel.wait_close().map_err(|e| from_ssh(e, timeout))?;
    let status = channel.exit_status().map_err(|e| from_ssh(e, timeout))?;

    // The battery tolerates individual missing tools; only an empty result is fatal.
    if status != 0 && stdout.trim().is_empty() {
        return Err(ProbeError::CommandFailed {
            status,
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(stdout)
}

fn from_ssh(err: ssh2::Error, timeout: Duration) -> ProbeError {
    match err.code() {
        ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT) => ProbeError::Timeout(timeout),
        _ => ProbeError::ConnectionFailed(err.to_string()),
    }
}

fn from_io(err: io::Error, timeout: Duration) -> ProbeError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ProbeError::Timeout(timeout),
        _ => ProbeError::ConnectionFailed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(node: &str) -> SshTarget {
        SshTarget {
            node_name: node.to_string(),
            host: "127.0.0.1".to_string(),
            port: 1,
            user: "pi".to_string(),
            key_path: None,
        }
    }

    #[tokio::test]
    async fn busy_slot_reports_session_busy_without_connecting() {
        let pool = SshSessionPool::new();
        let _held = pool
            .slot("rpi3")
            .busy
            .clone()
            .try_acquire_owned()
            .unwrap();

        let err = pool
            .exec(&target("rpi3"), "true", Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(err, ProbeError::SessionBusy);
        assert_eq!(err.kind(), "ProbeTimeout");
    }

    #[test]
    fn retain_drops_departed_nodes() {
        let pool = SshSessionPool::new();
        pool.slot("rpi1");
        pool.slot("rpi2");

        pool.retain_nodes(&HashSet::from(["rpi1".to_string()]));

        let names: Vec<String> = pool.slots().keys().cloned().collect();
        assert_eq!(names, vec!["rpi1".to_string()]);
    }

    #[test]
    fn libssh2_timeout_maps_to_probe_timeout() {
        let timeout = Duration::from_secs(8);
        let err = ssh2::Error::new(ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT), "timed out");
        assert_eq!(from_ssh(err, timeout), ProbeError::Timeout(timeout));

        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(from_io(refused, timeout), ProbeError::ConnectionFailed(_)));
    }
}
