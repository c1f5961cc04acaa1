//! WebP (RIFF) chunk filter.

use std::io::{self, Read, Seek, SeekFrom, Write};

use super::{copy_exact, invalid, skip_exact};

const VP8X_EXIF: u8 = 0x08;
const VP8X_XMP: u8 = 0x04;

fn is_metadata(fourcc: &[u8; 4]) -> bool {
    fourcc == b"EXIF" || fourcc == b"XMP "
}

/// Padded on-disk size of a chunk payload.
fn padded(size: u32) -> u64 {
    size as u64 + (size as u64 & 1)
}

/// Copy a WebP, dropping EXIF and XMP chunks. Returns the number dropped.
///
/// The RIFF size must be known before the body is written, so the input is
/// walked twice: once to total up the dropped chunks, once to copy.
pub(super) fn scrub<R: Read + Seek, W: Write>(r: &mut R, w: &mut W) -> io::Result<usize> {
    let start = r.stream_position()?;
    let riff_size = read_riff_header(r)?;

    let mut dropped_bytes = 0u64;
    let mut removed = 0;
    let mut remaining = riff_size.saturating_sub(4) as u64;
    while remaining >= 8 {
        let (fourcc, size) = read_chunk_header(r)?;
        if 8 + size as u64 > remaining {
            return Err(invalid(format!(
                "{} chunk overruns the RIFF size",
                String::from_utf8_lossy(&fourcc)
            )));
        }
        let body = padded(size);
        if is_metadata(&fourcc) {
            dropped_bytes += 8 + body;
            removed += 1;
        }
        skip_exact(r, body)?;
        remaining = remaining.saturating_sub(8 + body);
    }

    r.seek(SeekFrom::Start(start))?;
    read_riff_header(r)?;
    let new_size = (riff_size as u64)
        .checked_sub(dropped_bytes)
        .ok_or_else(|| invalid("RIFF size smaller than its metadata chunks"))? as u32;
    w.write_all(b"RIFF")?;
    w.write_all(&new_size.to_le_bytes())?;
    w.write_all(b"WEBP")?;

    let mut remaining = riff_size.saturating_sub(4) as u64;
    while remaining >= 8 {
        let (fourcc, size) = read_chunk_header(r)?;
        let body = padded(size);
        remaining = remaining.saturating_sub(8 + body);

        if is_metadata(&fourcc) {
            tracing::trace!("Dropping WebP chunk {}", String::from_utf8_lossy(&fourcc));
            skip_exact(r, body)?;
            continue;
        }

        w.write_all(&fourcc)?;
        w.write_all(&size.to_le_bytes())?;
        if &fourcc == b"VP8X" && body > 0 {
            let mut flags = [0u8; 1];
            r.read_exact(&mut flags)?;
            w.write_all(&[flags[0] & !(VP8X_EXIF | VP8X_XMP)])?;
            copy_exact(r, w, body - 1)?;
        } else {
            copy_exact(r, w, body)?;
        }
    }

    Ok(removed)
}

/// Validate the RIFF/WEBP header and return the declared RIFF size.
fn read_riff_header<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut header = [0u8; 12];
    r.read_exact(&mut header)?;
    if &header[..4] != b"RIFF" || &header[8..] != b"WEBP" {
        return Err(invalid("missing RIFF/WEBP header"));
    }
    Ok(u32::from_le_bytes([header[4], header[5], header[6], header[7]]))
}

fn read_chunk_header<R: Read>(r: &mut R) -> io::Result<([u8; 4], u32)> {
    let mut header = [0u8; 8];
    r.read_exact(&mut header)?;
    let fourcc = [header[0], header[1], header[2], header[3]];
    let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    Ok((fourcc, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::scrub::tests::{decode_rgba, sample_image, SAMPLE_HEIGHT, SAMPLE_WIDTH};
    use image::ImageFormat;
    use std::io::Cursor;

    fn chunk(fourcc: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = fourcc.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut out = b"RIFF".to_vec();
        out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
        out.extend_from_slice(b"WEBP");
        out.extend_from_slice(&body);
        out
    }

    /// Extended-format WebP: VP8X + the encoder's VP8L chunk + EXIF + XMP.
    fn webp_with_metadata() -> Vec<u8> {
        let mut simple = Vec::new();
        sample_image()
            .write_to(&mut Cursor::new(&mut simple), ImageFormat::WebP)
            .unwrap();
        // Everything after the 12-byte RIFF header is the bitstream chunk.
        let bitstream = simple[12..].to_vec();

        let mut vp8x = vec![VP8X_EXIF | VP8X_XMP, 0, 0, 0];
        vp8x.extend_from_slice(&(SAMPLE_WIDTH - 1).to_le_bytes()[..3]);
        vp8x.extend_from_slice(&(SAMPLE_HEIGHT - 1).to_le_bytes()[..3]);

        riff(&[
            chunk(b"VP8X", &vp8x),
            bitstream,
            chunk(b"EXIF", b"II*\0\x08\0\0\0\0\0\0\0\0"),
            chunk(b"XMP ", b"<x:xmpmeta/>"),
        ])
    }

    #[test]
    fn test_drops_exif_and_xmp_and_fixes_header() {
        let input = webp_with_metadata();
        let mut output = Vec::new();
        let removed = scrub(&mut Cursor::new(&input), &mut output).unwrap();

        assert_eq!(removed, 2);
        assert!(!output.windows(4).any(|w| w == b"EXIF"));
        assert!(!output.windows(4).any(|w| w == b"XMP "));

        let declared = u32::from_le_bytes([output[4], output[5], output[6], output[7]]) as usize;
        assert_eq!(declared + 8, output.len());
        // VP8X flags byte follows RIFF header (12) and chunk header (8).
        assert_eq!(output[20] & (VP8X_EXIF | VP8X_XMP), 0);
    }

    #[test]
    fn test_pixels_unchanged() {
        let input = webp_with_metadata();
        let mut output = Vec::new();
        scrub(&mut Cursor::new(&input), &mut output).unwrap();
        assert_eq!(decode_rgba(&input), decode_rgba(&output));
    }

    #[test]
    fn test_simple_webp_passes_through() {
        let mut simple = Vec::new();
        sample_image()
            .write_to(&mut Cursor::new(&mut simple), ImageFormat::WebP)
            .unwrap();
        let mut output = Vec::new();
        assert_eq!(scrub(&mut Cursor::new(&simple), &mut output).unwrap(), 0);
        assert_eq!(output, simple);
    }

    #[test]
    fn test_chunk_overrunning_riff_size_is_error() {
        // RIFF claims 12 bytes but the EXIF chunk alone declares 100.
        let mut input = b"RIFF".to_vec();
        input.extend_from_slice(&12u32.to_le_bytes());
        input.extend_from_slice(b"WEBP");
        input.extend_from_slice(&chunk(b"EXIF", &[0u8; 100]));

        let mut output = Vec::new();
        let err = scrub(&mut Cursor::new(&input), &mut output).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(output.is_empty());
    }

    #[test]
    fn test_odd_chunk_padding() {
        assert_eq!(padded(13), 14);
        assert_eq!(padded(12), 12);
    }
}
