//! Auth policy (§3 `AuthPolicy`, §4.2): method selection, credential
//! verification, and the auth-once IP whitelist.

use std::net::IpAddr;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::{
    error::SocksError,
    wire::{METHOD_NO_AUTH, METHOD_USERNAME_PASSWORD},
};

/// The outcome of [`AuthPolicy::select_method`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedMethod {
    NoAuth,
    UsernamePassword,
    Invalid,
}

/// Process-wide (well: per-[`ServerContext`](crate::context::ServerContext))
/// authentication policy: optional static credentials, plus an optional
/// "authenticate once per IP" whitelist.
///
/// Membership in the whitelist is monotonic: entries are appended under an
/// exclusive lock and never removed for the lifetime of the policy.
#[derive(Debug)]
pub struct AuthPolicy {
    credentials: Option<(Bytes, Bytes)>,
    whitelist: Option<RwLock<Vec<IpAddr>>>,
}

impl AuthPolicy {
    /// No credentials configured: every client authenticates with `NoAuth`.
    #[must_use]
    pub fn open() -> Self {
        Self {
            credentials: None,
            whitelist: None,
        }
    }

    /// Require the given username/password for every client.
    #[must_use]
    pub fn with_credentials(user: impl Into<Bytes>, pass: impl Into<Bytes>) -> Self {
        Self {
            credentials: Some((user.into(), pass.into())),
            whitelist: None,
        }
    }

    /// Enable the auth-once whitelist on top of configured credentials.
    ///
    /// # Panics
    ///
    /// Panics if no credentials were configured — auth-once only makes
    /// sense as a way to skip re-authentication, per §6's CLI validation
    /// (`-1` requires `-u`/`-P`), and that validation must happen before
    /// this is called.
    #[must_use]
    pub fn with_auth_once(mut self) -> Self {
        assert!(
            self.credentials.is_some(),
            "auth-once requires credentials to be configured"
        );
        self.whitelist = Some(RwLock::new(Vec::new()));
        self
    }

    #[must_use]
    pub fn requires_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// `selectMethod` (§4.2): evaluate the client's offered methods against
    /// this policy's preference order.
    #[must_use]
    pub fn select_method(&self, offered: &[u8], client_ip: IpAddr) -> SelectedMethod {
        let offers_no_auth = offered.contains(&METHOD_NO_AUTH);
        let offers_user_pass = offered.contains(&METHOD_USERNAME_PASSWORD);

        if self.credentials.is_none() {
            return if offers_no_auth {
                SelectedMethod::NoAuth
            } else {
                SelectedMethod::Invalid
            };
        }

        if offers_no_auth && self.client_is_whitelisted(client_ip) {
            return SelectedMethod::NoAuth;
        }

        if offers_user_pass {
            return SelectedMethod::UsernamePassword;
        }

        SelectedMethod::Invalid
    }

    fn client_is_whitelisted(&self, client_ip: IpAddr) -> bool {
        match &self.whitelist {
            Some(whitelist) => whitelist.read().contains(&client_ip),
            None => false,
        }
    }

    /// `verifyCredentials` (§4.2): byte-exact comparison against the
    /// configured credentials.
    pub fn verify_credentials(&self, user: &[u8], pass: &[u8]) -> Result<(), SocksError> {
        match &self.credentials {
            Some((expected_user, expected_pass)) => {
                if expected_user.as_ref() == user && expected_pass.as_ref() == pass {
                    Ok(())
                } else {
                    Err(SocksError::credentials_rejected())
                }
            }
            None => Err(SocksError::credentials_rejected()),
        }
    }

    /// `rememberClient` (§4.2): append `client_ip` to the whitelist if not
    /// already present.
    ///
    /// The check-then-insert happens entirely under the exclusive lock, so
    /// two concurrent authentications from the same IP cannot both observe
    /// an empty slot and both insert — the whitelist's size grows by
    /// exactly one per distinct IP regardless of racing callers.
    pub fn remember_client(&self, client_ip: IpAddr) {
        if let Some(whitelist) = &self.whitelist {
            let mut whitelist = whitelist.write();
            if !whitelist.contains(&client_ip) {
                whitelist.push(client_ip);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(n: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, n))
    }

    #[test]
    fn open_policy_selects_no_auth() {
        let policy = AuthPolicy::open();
        assert_eq!(
            policy.select_method(&[0x00], ip(1)),
            SelectedMethod::NoAuth
        );
    }

    #[test]
    fn credentialed_policy_rejects_no_auth_only_offer() {
        let policy = AuthPolicy::with_credentials("a", "b");
        assert_eq!(
            policy.select_method(&[0x00], ip(1)),
            SelectedMethod::Invalid
        );
    }

    #[test]
    fn credentialed_policy_selects_user_pass() {
        let policy = AuthPolicy::with_credentials("a", "b");
        assert_eq!(
            policy.select_method(&[0x00, 0x02], ip(1)),
            SelectedMethod::UsernamePassword
        );
    }

    #[test]
    fn verify_credentials_is_byte_exact() {
        let policy = AuthPolicy::with_credentials("a", "b");
        assert!(policy.verify_credentials(b"a", b"b").is_ok());
        assert!(policy.verify_credentials(b"a", b"c").is_err());
    }

    #[test]
    fn auth_once_allows_no_auth_after_remembering() {
        let policy = AuthPolicy::with_credentials("a", "b").with_auth_once();
        assert_eq!(
            policy.select_method(&[0x00], ip(1)),
            SelectedMethod::Invalid
        );
        policy.remember_client(ip(1));
        assert_eq!(
            policy.select_method(&[0x00], ip(1)),
            SelectedMethod::NoAuth
        );
        // a different IP was never remembered
        assert_eq!(
            policy.select_method(&[0x00], ip(2)),
            SelectedMethod::Invalid
        );
    }

    #[test]
    fn remember_client_is_idempotent() {
        let policy = AuthPolicy::with_credentials("a", "b").with_auth_once();
        policy.remember_client(ip(1));
        policy.remember_client(ip(1));
        policy.remember_client(ip(1));
        let whitelist = policy.whitelist.as_ref().unwrap().read();
        assert_eq!(whitelist.len(), 1);
    }
}
