//! Content fingerprinting for artifact naming.

use blake3::Hasher as Blake3Hasher;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Lowercase hex BLAKE3 digest of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Streams files through BLAKE3.
pub struct Fingerprinter;

impl Fingerprinter {
    /// Hash everything `reader` yields.
    ///
    /// The digest is only produced once the reader reports EOF; a read error
    /// part-way through yields the error, never a partial hash.
    pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<ContentHash> {
        let mut hasher = Blake3Hasher::new();

        // Use 64KB buffer for efficient reading
        let mut buffer = [0u8; 65536];
        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(ContentHash(hasher.finalize().to_hex().to_string()))
    }

    /// Hash a file's contents without loading it into memory.
    pub fn content_hash(path: &Path) -> std::io::Result<ContentHash> {
        let file = File::open(path)?;
        Self::hash_reader(BufReader::new(file))
    }
}
