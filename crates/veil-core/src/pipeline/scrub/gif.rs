//! GIF block filter.

use std::io::{self, Read, Write};

use super::{copy_exact, invalid, read_u8};

const IMAGE_DESCRIPTOR: u8 = 0x2C;
const EXTENSION: u8 = 0x21;
const TRAILER: u8 = 0x3B;
const COMMENT_LABEL: u8 = 0xFE;
const APPLICATION_LABEL: u8 = 0xFF;

/// Application extensions that affect playback or colour.
const KEPT_APPLICATIONS: [&[u8; 11]; 3] = [b"NETSCAPE2.0", b"ANIMEXTS1.0", b"ICCRGBG1012"];

/// Copy a GIF, dropping comment and unknown application extensions.
/// Returns the number of blocks dropped.
pub(super) fn scrub<R: Read, W: Write>(r: &mut R, w: &mut W) -> io::Result<usize> {
    // Header + logical screen descriptor
    let mut head = [0u8; 13];
    r.read_exact(&mut head)?;
    if &head[..3] != b"GIF" {
        return Err(invalid("missing GIF signature"));
    }
    w.write_all(&head)?;
    let packed = head[10];
    if packed & 0x80 != 0 {
        copy_exact(r, w, color_table_len(packed))?;
    }

    let mut removed = 0;
    loop {
        let introducer = read_u8(r)?;
        match introducer {
            TRAILER => {
                w.write_all(&[TRAILER])?;
                return Ok(removed);
            }
            IMAGE_DESCRIPTOR => {
                w.write_all(&[introducer])?;
                let mut descriptor = [0u8; 9];
                r.read_exact(&mut descriptor)?;
                w.write_all(&descriptor)?;
                if descriptor[8] & 0x80 != 0 {
                    copy_exact(r, w, color_table_len(descriptor[8]))?;
                }
                // LZW minimum code size
                w.write_all(&[read_u8(r)?])?;
                copy_sub_blocks(r, w)?;
            }
            EXTENSION => {
                let label = read_u8(r)?;
                let blocks = read_sub_blocks(r)?;
                if is_metadata(label, &blocks) {
                    tracing::trace!("Dropping GIF extension 0x{label:02X}");
                    removed += 1;
                } else {
                    w.write_all(&[EXTENSION, label])?;
                    w.write_all(&blocks)?;
                }
            }
            other => return Err(invalid(format!("unexpected GIF block 0x{other:02X}"))),
        }
    }
}

fn color_table_len(packed: u8) -> u64 {
    3 * (1u64 << ((packed & 0x07) + 1))
}

fn is_metadata(label: u8, blocks: &[u8]) -> bool {
    match label {
        COMMENT_LABEL => true,
        APPLICATION_LABEL => {
            // First sub-block is the 11-byte identifier + auth code.
            let id = blocks.get(1..12);
            !matches!(id, Some(id) if KEPT_APPLICATIONS.iter().any(|k| &k[..] == id))
        }
        _ => false,
    }
}

/// Read a sub-block chain including its length prefixes and terminator.
fn read_sub_blocks<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let len = read_u8(r)?;
        out.push(len);
        if len == 0 {
            return Ok(out);
        }
        let start = out.len();
        out.resize(start + len as usize, 0);
        r.read_exact(&mut out[start..])?;
    }
}

fn copy_sub_blocks<R: Read, W: Write>(r: &mut R, w: &mut W) -> io::Result<()> {
    loop {
        let len = read_u8(r)?;
        w.write_all(&[len])?;
        if len == 0 {
            return Ok(());
        }
        copy_exact(r, w, len as u64)?;
    }
}
