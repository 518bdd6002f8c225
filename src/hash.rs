//! Content hashing for incremental change detection (§4.2, §4.4).
//!
//! A file is reparsed only when its hash differs from the hash stored for
//! it at the last successful index. Hashing streams the file in fixed-size
//! chunks so memory use does not scale with file size.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 8192;

/// Hex-encoded SHA-256 of the file at `path`, read in 8 KiB chunks.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex_encode(&hasher.finalize()))
}

/// Hex-encoded SHA-256 of an in-memory buffer, used by tests and by
/// extractors that already hold the file content.
pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn same_content_hashes_identically() {
        assert_eq!(hash_bytes(b"hello"), hash_bytes(b"hello"));
    }

    #[test]
    fn different_content_hashes_differently() {
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[test]
    fn hash_file_matches_hash_bytes_for_same_content() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"the quick brown fox").unwrap();
        file.flush().unwrap();

        assert_eq!(hash_file(file.path()).unwrap(), hash_bytes(b"the quick brown fox"));
    }

    #[test]
    fn hash_file_handles_content_larger_than_one_chunk() {
        let mut file = NamedTempFile::new().unwrap();
        let content = vec![b'a'; CHUNK_SIZE * 3 + 17];
        file.write_all(&content).unwrap();
        file.flush().unwrap();

        assert_eq!(hash_file(file.path()).unwrap(), hash_bytes(&content));
    }

    #[test]
    fn empty_file_hashes_to_sha256_of_empty_input() {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(hash_file(file.path()).unwrap(), hash_bytes(b""));
    }
}
