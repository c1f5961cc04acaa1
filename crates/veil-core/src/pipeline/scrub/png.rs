//! PNG chunk filter.

use std::io::{self, Read, Write};

use super::{copy_exact, invalid, skip_exact};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Ancillary chunks that carry text, EXIF or timestamps.
const METADATA_CHUNKS: [&[u8; 4]; 5] = [b"tEXt", b"zTXt", b"iTXt", b"eXIf", b"tIME"];

/// Copy a PNG chunk by chunk, dropping metadata chunks. Returns the number dropped.
///
/// Kept chunks are copied with their original CRCs.
pub(super) fn scrub<R: Read, W: Write>(r: &mut R, w: &mut W) -> io::Result<usize> {
    let mut signature = [0u8; 8];
    r.read_exact(&mut signature)?;
    if signature != SIGNATURE {
        return Err(invalid("missing PNG signature"));
    }
    w.write_all(&signature)?;

    let mut removed = 0;
    loop {
        let mut header = [0u8; 8];
        r.read_exact(&mut header)?;
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let kind = [header[4], header[5], header[6], header[7]];
        // data + CRC
        let body = len + 4;

        if METADATA_CHUNKS.contains(&&kind) {
            tracing::trace!("Dropping PNG chunk {}", String::from_utf8_lossy(&kind));
            skip_exact(r, body)?;
            removed += 1;
        } else {
            w.write_all(&header)?;
            copy_exact(r, w, body)?;
        }

        if &kind == b"IEND" {
            return Ok(removed);
        }
    }
}
