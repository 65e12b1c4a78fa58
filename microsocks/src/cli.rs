//! CLI surface (§6) and its validated conversion into a [`ServerConfig`].

use std::net::IpAddr;

use clap::Parser;
use zeroize::Zeroize;

/// A small SOCKS5 proxy server.
#[derive(Debug, Parser)]
#[command(name = "microsocks", version, about)]
pub struct Cli {
    /// Suppress informational logging; only warnings and errors are shown.
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Remember authenticated client IPs and allow them to skip
    /// re-authentication. Requires `-u`/`-P`.
    #[arg(short = '1', long = "auth-once")]
    pub auth_once: bool,

    /// Address to listen on.
    #[arg(short = 'i', long = "listen-ip", default_value = "0.0.0.0")]
    pub listen_ip: IpAddr,

    /// Port to listen on.
    #[arg(short = 'p', long, default_value_t = 1080)]
    pub port: u16,

    /// Required username, if authentication is enabled.
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Required password, if authentication is enabled.
    #[arg(short = 'P', long)]
    pub pass: Option<String>,

    /// Local address used for outbound (relayed) connections.
    #[arg(short = 'b', long = "bind-addr")]
    pub bind_addr: Option<IpAddr>,
}

/// The parsed, validated result of CLI configuration (§3.1). Immutable once
/// constructed; invalid combinations are rejected in [`ServerConfig::from_cli`]
/// before a listener is ever bound.
pub struct ServerConfig {
    pub listen_addr: std::net::SocketAddr,
    pub bind_addr: Option<IpAddr>,
    pub credentials: Option<(String, String)>,
    pub auth_once: bool,
    pub quiet: bool,
}

impl ServerConfig {
    /// Validate and consume a [`Cli`], matching §6 exactly: `-u` xor `-P` is
    /// a fatal error, as is `-1` without credentials.
    ///
    /// The credential `String`s are zeroed in place immediately after being
    /// copied out, once `Cli` is no longer needed — the portable, safe
    /// substitute for zeroing the process's own argv buffer (which is owned
    /// by the OS/libc and not reachable from safe Rust).
    pub fn from_cli(mut cli: Cli) -> Result<Self, String> {
        let credentials = match (cli.user.take(), cli.pass.take()) {
            (Some(mut user), Some(mut pass)) => {
                let creds = (user.clone(), pass.clone());
                user.zeroize();
                pass.zeroize();
                Some(creds)
            }
            (None, None) => None,
            (Some(mut user), None) => {
                user.zeroize();
                return Err("-u requires -P to also be set".to_owned());
            }
            (None, Some(mut pass)) => {
                pass.zeroize();
                return Err("-P requires -u to also be set".to_owned());
            }
        };

        if cli.auth_once && credentials.is_none() {
            return Err("-1 requires -u and -P to be set".to_owned());
        }

        Ok(Self {
            listen_addr: std::net::SocketAddr::new(cli.listen_ip, cli.port),
            bind_addr: cli.bind_addr,
            credentials,
            auth_once: cli.auth_once,
            quiet: cli.quiet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            quiet: false,
            auth_once: false,
            listen_ip: "0.0.0.0".parse().unwrap(),
            port: 1080,
            user: None,
            pass: None,
            bind_addr: None,
        }
    }

    #[test]
    fn user_without_pass_is_rejected() {
        let mut cli = base_cli();
        cli.user = Some("john".to_owned());
        assert!(ServerConfig::from_cli(cli).is_err());
    }

    #[test]
    fn auth_once_without_credentials_is_rejected() {
        let mut cli = base_cli();
        cli.auth_once = true;
        assert!(ServerConfig::from_cli(cli).is_err());
    }

    #[test]
    fn valid_credentials_and_auth_once_are_accepted() {
        let mut cli = base_cli();
        cli.user = Some("john".to_owned());
        cli.pass = Some("secret".to_owned());
        cli.auth_once = true;
        let config = ServerConfig::from_cli(cli).unwrap();
        assert!(config.auth_once);
        assert_eq!(
            config.credentials,
            Some(("john".to_owned(), "secret".to_owned()))
        );
    }
}
