use std::path::Path;

use mcdex_common::error::Result;
use sha2::{Digest, Sha256};
use tracing::debug;

pub fn sha256_file_sync(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mut hasher = Sha256::new();
    let bytes = std::io::copy(&mut reader, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    debug!("SHA256 of {} ({} bytes): {}", path.display(), bytes, actual);
    Ok(actual)
}
