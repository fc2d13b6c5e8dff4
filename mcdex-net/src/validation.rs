// mcdex-net/src/validation.rs
use std::fs::File;
use std::io;
use std::path::Path;

use mcdex_common::error::{McdexError, Result};
use sha2::{Digest, Sha256};
use url::Url;

pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    tracing::debug!("Verifying checksum for: {}", path.display());
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes_copied = io::copy(&mut file, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    tracing::debug!(
        "Calculated SHA256: {} ({} bytes read)",
        actual,
        bytes_copied
    );
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(McdexError::Integrity {
            target: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Verifies that the detected content type of the file is one of `accepted`
/// (extensions as reported by `infer`, e.g. `zip`, `jar`).
pub fn verify_content_type(path: &Path, accepted: &[&str]) -> Result<()> {
    let kind_opt = infer::get_from_path(path)?;
    match kind_opt {
        Some(kind)
            if accepted
                .iter()
                .any(|ext| kind.extension().eq_ignore_ascii_case(ext)) =>
        {
            tracing::debug!(
                "Content type verified: {} for {}",
                kind.extension(),
                path.display()
            );
            Ok(())
        }
        Some(kind) => Err(McdexError::Validation(format!(
            "Content type mismatch for {}: expected one of {:?}, but detected '{}'",
            path.display(),
            accepted,
            kind.extension()
        ))),
        None => Err(McdexError::Validation(format!(
            "Could not determine content type for {}",
            path.display()
        ))),
    }
}

/// Accepts http and https URLs with a host; anything else is refused.
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str)
        .map_err(|e| McdexError::Validation(format!("Failed to parse URL '{url_str}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(McdexError::Validation(format!(
            "Invalid URL scheme for '{}': must be http(s), got '{}'",
            url_str,
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(McdexError::Validation(format!(
            "URL '{url_str}' has no host"
        )));
    }
    if url.scheme() == "http" {
        tracing::debug!("Using plain http for {}", url_str);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_web_urls_validate() {
        assert!(validate_url("https://example.com/mod.jar").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/mod.jar").is_ok());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn zip_content_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("pack.zip");
        // Minimal empty zip: end-of-central-directory record only.
        let mut eocd = vec![0x50, 0x4b, 0x05, 0x06];
        eocd.extend_from_slice(&[0u8; 18]);
        std::fs::write(&zip_path, &eocd).unwrap();
        assert!(verify_content_type(&zip_path, &["zip", "jar"]).is_ok());

        let text_path = dir.path().join("pack.txt");
        std::fs::write(&text_path, b"<html>not a zip</html>").unwrap();
        assert!(verify_content_type(&text_path, &["zip"]).is_err());
    }
}
