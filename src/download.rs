//! Fetching bootstrap scripts over HTTP and verifying them.
//!
//! Transport is `curl`, run through the [`Host`] so a retry wrapper can
//! re-attempt it and tests can script it.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::host::Host;
use crate::process::Cmd;

/// Per-attempt ceiling for a single download.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Download `url` to `dest`, replacing any partial file from an earlier try.
pub fn fetch(host: &dyn Host, url: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::io(format!("failed to create {}", parent.display()), e))?;
    }
    if dest.exists() {
        fs::remove_file(dest)
            .map_err(|e| Error::io(format!("failed to remove {}", dest.display()), e))?;
    }

    host.run(
        &Cmd::new("curl")
            .args(["-fsSL", "--retry", "0", "-o"])
            .arg_path(dest)
            .arg(url)
            .timeout(FETCH_TIMEOUT),
    )?;
    Ok(())
}

/// SHA-256 of a file as lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = fs::File::open(path)
        .map_err(|e| Error::io(format!("failed to open {} for checksum", path.display()), e))?;
    let mut reader = std::io::BufReader::with_capacity(64 * 1024, file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Fail with [`Error::ChecksumMismatch`] unless `path` hashes to `expected`.
pub fn verify_sha256(path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_file(path)?;
    if actual != expected.trim().to_lowercase() {
        return Err(Error::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
