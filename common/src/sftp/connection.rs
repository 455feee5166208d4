// SFTP connection management
// Blocking ssh2 transport with an SFTP channel on top

use super::auth::{authenticate_session, AuthPlan};
use super::walker::{DirectoryReader, EntryStat, Walker};
use super::RemoteSession;
use crate::config::SftpConfig;
use crate::errors::{RemoteError, SftpError};
use crate::models::{FsCapacity, WalkEntry};
use ssh2::{Session, Sftp};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Authenticated SSH session plus the SFTP client bound to it
pub struct SftpConnection {
    sftp: Option<Sftp>,
    session: Session,
}

impl SftpConnection {
    /// Dial, handshake, authenticate and open the SFTP channel.
    ///
    /// The server host key is not verified. If the SFTP subsystem cannot be
    /// started the SSH transport is disconnected before returning.
    #[instrument(skip(config, plan), fields(host = %config.host, port = %config.port))]
    pub fn open(config: &SftpConfig, plan: &AuthPlan) -> Result<Self, SftpError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let tcp = dial(&config.host, config.port, timeout)?;

        let mut sess = Session::new().map_err(|e| {
            error!(error = %e, "Failed to create SSH session");
            SftpError::ConnectionFailed(format!("Failed to create SSH session: {}", e))
        })?;
        sess.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        sess.set_tcp_stream(tcp);

        sess.handshake().map_err(|e| {
            error!(error = %e, "SSH handshake failed");
            SftpError::ConnectionFailed(format!("SSH handshake failed: {}", e))
        })?;

        log_host_key(&sess);

        if let Err(e) = authenticate_session(&sess, &config.user, plan) {
            disconnect(&sess, "authentication failed");
            return Err(e);
        }

        let sftp = match sess.sftp() {
            Ok(sftp) => sftp,
            Err(e) => {
                error!(error = %e, "Failed to open SFTP channel");
                disconnect(&sess, "sftp subsystem unavailable");
                return Err(SftpError::ConnectionFailed(format!(
                    "Failed to open SFTP channel: {}",
                    e
                )));
            }
        };

        info!("SFTP connection established");
        Ok(Self {
            sftp: Some(sftp),
            session: sess,
        })
    }

    fn sftp(&self) -> Option<&Sftp> {
        self.sftp.as_ref()
    }
}

fn dial(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, SftpError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            error!(error = %e, host = %host, port = %port, "Failed to resolve address");
            SftpError::ConnectionFailed(format!("Failed to resolve {}:{}: {}", host, port, e))
        })?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(tcp) => {
                let io_timeout = Some(timeout);
                tcp.set_read_timeout(io_timeout).map_err(|e| {
                    SftpError::ConnectionFailed(format!("Failed to set read timeout: {}", e))
                })?;
                tcp.set_write_timeout(io_timeout).map_err(|e| {
                    SftpError::ConnectionFailed(format!("Failed to set write timeout: {}", e))
                })?;
                return Ok(tcp);
            }
            Err(e) => {
                debug!(error = %e, addr = %addr, "Connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    let reason = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no addresses resolved".to_string());
    error!(error = %reason, host = %host, port = %port, "Failed to connect");
    Err(SftpError::ConnectionFailed(format!(
        "Failed to connect to {}:{}: {}",
        host, port, reason
    )))
}

/// Host keys are accepted without verification; the fingerprint is only logged
fn log_host_key(sess: &Session) {
    if let (Some((_, key_type)), Some(hash)) =
        (sess.host_key(), sess.host_key_hash(ssh2::HashType::Sha256))
    {
        let fingerprint = hash
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":");
        debug!(host_key_type = ?key_type, fingerprint = %fingerprint, "Host key not verified");
    }
}

fn disconnect(sess: &Session, reason: &str) {
    if let Err(e) = sess.disconnect(None, reason, None) {
        error!(error = %e, event = "closing SSH connection", "Failed to disconnect");
    }
}

impl DirectoryReader for SftpConnection {
    fn lstat(&self, path: &str) -> Result<EntryStat, RemoteError> {
        let sftp = self
            .sftp()
            .ok_or_else(|| RemoteError::walk(path, "session closed"))?;
        let stat = sftp
            .lstat(Path::new(path))
            .map_err(|e| RemoteError::walk(path, e))?;
        Ok(EntryStat {
            is_dir: stat.is_dir(),
            size: stat.size.unwrap_or(0),
        })
    }

    fn read_dir(&self, path: &str) -> Result<Vec<(String, EntryStat)>, RemoteError> {
        let sftp = self
            .sftp()
            .ok_or_else(|| RemoteError::walk(path, "session closed"))?;
        let entries = sftp
            .readdir(Path::new(path))
            .map_err(|e| RemoteError::walk(path, e))?;
        Ok(entries
            .into_iter()
            .map(|(child, stat)| {
                (
                    child.to_string_lossy().into_owned(),
                    EntryStat {
                        is_dir: stat.is_dir(),
                        size: stat.size.unwrap_or(0),
                    },
                )
            })
            .collect())
    }
}

impl RemoteSession for SftpConnection {
    fn capacity(&self, path: &str) -> Result<FsCapacity, RemoteError> {
        let sftp = self
            .sftp()
            .ok_or_else(|| RemoteError::capacity(path, "session closed"))?;
        let remote = Path::new(path);
        // ssh2 only offers statvfs on an open handle, so the path must be
        // listable (directories) or readable (files)
        let mut handle = sftp
            .opendir(remote)
            .or_else(|_| sftp.open(remote))
            .map_err(|e| RemoteError::capacity(path, e))?;
        let vfs = handle
            .statvfs()
            .map_err(|e| RemoteError::capacity(path, e))?;

        Ok(FsCapacity {
            fragment_size: u64::from(vfs.f_frsize),
            total_blocks: u64::from(vfs.f_blocks),
            free_blocks: u64::from(vfs.f_bfree),
        })
    }

    fn walk<'a>(
        &'a self,
        root: &str,
    ) -> Box<dyn Iterator<Item = Result<WalkEntry, RemoteError>> + 'a> {
        Box::new(Walker::new(self, root))
    }

    /// SFTP channel first, then the SSH transport
    fn close(&mut self) {
        let Some(mut sftp) = self.sftp.take() else {
            return;
        };
        if let Err(e) = sftp.shutdown() {
            error!(error = %e, event = "closing SFTP connection", "Failed to close SFTP channel");
        }
        drop(sftp);
        disconnect(&self.session, "closing");
        debug!("SFTP connection closed");
    }
}

impl Drop for SftpConnection {
    fn drop(&mut self) {
        self.close();
    }
}
