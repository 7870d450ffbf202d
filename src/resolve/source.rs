//! Source repository location and credentials.

use std::fmt;

use serde::{Serialize, Serializer};

/// Username and password for an https clone.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Remote (or local) git repository holding the installer source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRepo {
    pub url: String,
    pub credentials: Option<Credentials>,
}

impl SourceRepo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// URL handed to `git clone`. Credentials are embedded, percent-encoded,
    /// for `https://` URLs only.
    pub fn clone_url(&self) -> String {
        match (&self.credentials, self.url.strip_prefix("https://")) {
            (Some(creds), Some(rest)) => format!(
                "https://{}:{}@{}",
                encode_userinfo(&creds.username),
                encode_userinfo(&creds.password),
                rest
            ),
            _ => self.url.clone(),
        }
    }

    /// True for `file://` URLs and plain paths.
    pub fn is_local(&self) -> bool {
        self.url.starts_with("file://") || self.url.starts_with('/') || self.url.starts_with('.')
    }

    /// Host and port to check before cloning, or `None` for local sources.
    pub fn endpoint(&self) -> Option<(String, u16)> {
        if self.is_local() {
            return None;
        }

        let (rest, default_port) = if let Some(rest) = self.url.strip_prefix("https://") {
            (rest, 443)
        } else if let Some(rest) = self.url.strip_prefix("http://") {
            (rest, 80)
        } else if let Some(rest) = self.url.strip_prefix("ssh://") {
            (rest, 22)
        } else if let Some(rest) = self.url.strip_prefix("git://") {
            (rest, 9418)
        } else {
            // scp-like `user@host:path`
            (self.url.as_str(), 22)
        };

        let authority = rest.split('/').next().unwrap_or(rest);
        let authority = authority.rsplit('@').next().unwrap_or(authority);

        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => (host, port),
                // `host:path` in scp syntax
                Err(_) => (host, default_port),
            },
            None => (authority, default_port),
        };

        if host.is_empty() {
            None
        } else {
            Some((host.to_string(), port))
        }
    }
}

impl fmt::Display for SourceRepo {
    /// Never prints credentials.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credentials {
            Some(creds) => write!(f, "{} (as {})", self.url, creds.username),
            None => f.write_str(&self.url),
        }
    }
}

impl Serialize for SourceRepo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn encode_userinfo(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
