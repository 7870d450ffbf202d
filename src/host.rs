//! The machine being bootstrapped.
//!
//! Everything the core needs from the outside world goes through [`Host`]:
//! environment variables, PATH lookups, external processes, DNS, and sleeping
//! between retries. [`SystemHost`] talks to the real machine.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::process::{self, Cmd, CommandResult};

/// Suspends the single control thread between retry attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub trait Host {
    fn env_var(&self, key: &str) -> Option<String>;

    /// Full path of `program` if it is on PATH.
    fn find_program(&self, program: &str) -> Option<PathBuf>;

    /// Run a command, honoring its `allow_fail` and timeout settings.
    fn run(&self, cmd: &Cmd) -> Result<CommandResult>;

    fn lookup_host(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>>;

    fn sleeper(&self) -> &dyn Sleeper;
}

/// The real machine.
pub struct SystemHost;

impl Host for SystemHost {
    fn env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn find_program(&self, program: &str) -> Option<PathBuf> {
        process::which(program)
    }

    fn run(&self, cmd: &Cmd) -> Result<CommandResult> {
        cmd.run()
    }

    fn lookup_host(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::Dns {
                host: host.to_string(),
                reason: e.to_string(),
            })?
            .collect();
        if addrs.is_empty() {
            return Err(Error::Dns {
                host: host.to_string(),
                reason: "no addresses returned".to_string(),
            });
        }
        Ok(addrs)
    }

    fn sleeper(&self) -> &dyn Sleeper {
        &ThreadSleeper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_resolves() {
        let addrs = SystemHost.lookup_host("localhost", 22).unwrap();
        assert!(!addrs.is_empty());
    }

    #[test]
    fn test_system_host_runs_commands() {
        let result = SystemHost.run(&Cmd::new("echo").arg("ok")).unwrap();
        assert_eq!(result.stdout_trimmed(), "ok");
    }

    #[test]
    fn test_sleeper_sleeps() {
        let start = std::time::Instant::now();
        SystemHost.sleeper().sleep(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
