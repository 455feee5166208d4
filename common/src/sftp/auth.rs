// SFTP authentication: method selection and negotiation

use super::credentials::{is_blank, KeyMaterial};
use super::keys::{parse_private_key, SigningKey};
use crate::errors::SftpError;
use ssh2::Session;
use ssh_key::LineEnding;
use std::fmt;
use tracing::{debug, error};
use zeroize::Zeroizing;

/// One way of presenting credentials to the server
pub enum AuthMethod {
    PublicKey(SigningKey),
    Password(Zeroizing<String>),
}

impl AuthMethod {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::PublicKey(_) => "publickey",
            AuthMethod::Password(_) => "password",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::PublicKey(key) => f.debug_tuple("PublicKey").field(key).finish(),
            AuthMethod::Password(_) => f.debug_tuple("Password").field(&"<redacted>").finish(),
        }
    }
}

/// Ordered authentication methods offered during negotiation.
/// Never empty.
#[derive(Debug)]
pub struct AuthPlan {
    methods: Vec<AuthMethod>,
}

impl AuthPlan {
    pub fn new(methods: Vec<AuthMethod>) -> Result<Self, SftpError> {
        if methods.is_empty() {
            return Err(SftpError::NoCredentialsProvided);
        }
        Ok(Self { methods })
    }

    /// Select the methods to offer.
    ///
    /// With both a key and a password the public key goes first and the
    /// password second; the server picks whichever it accepts.
    pub fn build(password: &str, material: &KeyMaterial) -> Result<Self, SftpError> {
        let has_password = !is_blank(password);

        let methods = match (material.has_key(), has_password) {
            (true, true) => {
                debug!("will be authenticating using key and password");
                let key = parse_private_key(material.key(), material.passphrase())?;
                vec![
                    AuthMethod::PublicKey(key),
                    AuthMethod::Password(Zeroizing::new(password.to_string())),
                ]
            }
            (true, false) => {
                debug!("will be authenticating using key");
                let key = parse_private_key(material.key(), material.passphrase())?;
                vec![AuthMethod::PublicKey(key)]
            }
            (false, true) => {
                debug!("will be authenticating using password");
                vec![AuthMethod::Password(Zeroizing::new(password.to_string()))]
            }
            (false, false) => return Err(SftpError::NoCredentialsProvided),
        };

        Self::new(methods)
    }

    pub fn methods(&self) -> &[AuthMethod] {
        &self.methods
    }
}

/// Offer the plan's methods in order until the session is authenticated
pub fn authenticate_session(
    sess: &Session,
    username: &str,
    plan: &AuthPlan,
) -> Result<(), SftpError> {
    let mut failures = Vec::with_capacity(plan.methods().len());

    for method in plan.methods() {
        debug!(username = %username, method = method.kind(), "Offering authentication method");
        let result = match method {
            AuthMethod::PublicKey(SigningKey::OpenSsh(key)) => {
                let private = key
                    .to_openssh(LineEnding::LF)
                    .map_err(|e| SftpError::InvalidKeyFormat(e.to_string()))?;
                let public = key.public_key().to_openssh().ok();
                sess.userauth_pubkey_memory(username, public.as_deref(), &private, None)
            }
            // libssh2 derives the public half and decrypts the PEM itself
            AuthMethod::PublicKey(SigningKey::Pem { pem, passphrase }) => sess
                .userauth_pubkey_memory(
                    username,
                    None,
                    pem,
                    passphrase.as_deref().map(String::as_str),
                ),
            AuthMethod::Password(password) => sess.userauth_password(username, password),
        };

        match result {
            Ok(()) if sess.authenticated() => {
                debug!(username = %username, method = method.kind(), "Authenticated");
                return Ok(());
            }
            Ok(()) => {
                debug!(method = method.kind(), "Partial authentication, continuing");
            }
            Err(e) => {
                debug!(error = %e, method = method.kind(), "Authentication method rejected");
                failures.push(format!("{}: {}", method.kind(), e));
            }
        }
    }

    if sess.authenticated() {
        return Ok(());
    }

    error!(username = %username, "All authentication methods were rejected");
    Err(SftpError::AuthenticationFailed(format!(
        "no method accepted for user {}: [{}]",
        username,
        failures.join("; ")
    )))
}
