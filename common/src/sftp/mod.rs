// SFTP session layer: credentials, keys, authentication, connection, traversal

mod auth;
mod connection;
mod credentials;
mod keys;
mod walker;

pub use auth::{authenticate_session, AuthMethod, AuthPlan};
pub use connection::SftpConnection;
pub use credentials::{CredentialSource, KeyMaterial};
pub use keys::{parse_private_key, SigningKey};
pub use walker::{DirectoryReader, EntryStat, Walker};

#[cfg(test)]
pub(crate) use walker::memory::MemoryTree;

use crate::config::SftpConfig;
use crate::errors::{RemoteError, SftpError};
use crate::models::{FsCapacity, WalkEntry};
use tracing::instrument;

/// An open remote session, owned by a single scrape
pub trait RemoteSession {
    /// Capacity of the filesystem containing `path`
    fn capacity(&self, path: &str) -> Result<FsCapacity, RemoteError>;

    /// Recursive traversal rooted at `root`
    fn walk<'a>(
        &'a self,
        root: &str,
    ) -> Box<dyn Iterator<Item = Result<WalkEntry, RemoteError>> + 'a>;

    /// Release the session. Failures are logged, never returned.
    fn close(&mut self);
}

/// Opens a fresh session for every scrape
#[cfg_attr(test, mockall::automock)]
pub trait SessionFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn RemoteSession>, SftpError>;
}

/// Production factory: resolves credentials from configuration and dials
/// the server with ssh2
pub struct SshSessionFactory {
    config: SftpConfig,
}

impl SshSessionFactory {
    pub fn new(config: SftpConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for SshSessionFactory {
    #[instrument(skip(self), fields(host = %self.config.host, user = %self.config.user))]
    fn open(&self) -> Result<Box<dyn RemoteSession>, SftpError> {
        let material = KeyMaterial::resolve(&CredentialSource::from(&self.config))?;
        let plan = AuthPlan::build(&self.config.password, &material)?;
        let connection = SftpConnection::open(&self.config, &plan)?;
        Ok(Box::new(connection))
    }
}
