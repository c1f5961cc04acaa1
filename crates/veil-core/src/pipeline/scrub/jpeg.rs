//! JPEG segment filter.

use std::io::{self, Read, Write};

use super::{invalid, read_u8};

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;
const COM: u8 = 0xFE;
const APP0: u8 = 0xE0;
const APP2: u8 = 0xE2;
const APP14: u8 = 0xEE;

/// Copy a JPEG, dropping metadata segments. Returns the number dropped.
///
/// Segments are buffered one at a time (at most 64 KiB); scan data is copied
/// byte-wise until the next marker. Anything after EOI is discarded.
pub(super) fn scrub<R: Read, W: Write>(r: &mut R, w: &mut W) -> io::Result<usize> {
    let mut soi = [0u8; 2];
    r.read_exact(&mut soi)?;
    if soi != [0xFF, SOI] {
        return Err(invalid("missing JPEG start-of-image marker"));
    }
    w.write_all(&soi)?;

    let mut removed = 0;
    let mut marker = next_marker(r)?;
    loop {
        match marker {
            EOI => {
                w.write_all(&[0xFF, EOI])?;
                return Ok(removed);
            }
            TEM | 0xD0..=0xD7 => {
                w.write_all(&[0xFF, marker])?;
                marker = next_marker(r)?;
            }
            _ => {
                let payload = read_segment(r)?;
                if is_metadata(marker, &payload) {
                    tracing::trace!("Dropping JPEG segment 0x{marker:02X} ({} bytes)", payload.len());
                    removed += 1;
                } else {
                    write_segment(w, marker, &payload)?;
                }

                marker = if marker == SOS {
                    match copy_scan(r, w)? {
                        Some(next) => next,
                        // Truncated after the scan; close the image ourselves.
                        None => EOI,
                    }
                } else {
                    next_marker(r)?
                };
            }
        }
    }
}

fn is_metadata(marker: u8, payload: &[u8]) -> bool {
    match marker {
        // JFIF header and Adobe colour transform are needed to decode correctly.
        APP0 | APP14 => false,
        APP2 => !payload.starts_with(b"ICC_PROFILE\0"),
        0xE1..=0xEF => true,
        COM => true,
        _ => false,
    }
}

fn next_marker<R: Read>(r: &mut R) -> io::Result<u8> {
    if read_u8(r)? != 0xFF {
        return Err(invalid("expected JPEG marker"));
    }
    let mut marker = read_u8(r)?;
    while marker == 0xFF {
        marker = read_u8(r)?;
    }
    Ok(marker)
}

fn read_segment<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let mut len = [0u8; 2];
    r.read_exact(&mut len)?;
    let len = u16::from_be_bytes(len) as usize;
    if len < 2 {
        return Err(invalid("JPEG segment length below 2"));
    }
    let mut payload = vec![0u8; len - 2];
    r.read_exact(&mut payload)?;
    Ok(payload)
}

fn write_segment<W: Write>(w: &mut W, marker: u8, payload: &[u8]) -> io::Result<()> {
    let len = (payload.len() + 2) as u16;
    w.write_all(&[0xFF, marker])?;
    w.write_all(&len.to_be_bytes())?;
    w.write_all(payload)
}

/// Copy entropy-coded data up to the next marker and return it, or `None` at EOF.
fn copy_scan<R: Read, W: Write>(r: &mut R, w: &mut W) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        if r.read(&mut byte)? == 0 {
            return Ok(None);
        }
        if byte[0] != 0xFF {
            w.write_all(&byte)?;
            continue;
        }
        let mut next = read_u8(r)?;
        while next == 0xFF {
            next = read_u8(r)?;
        }
        match next {
            // Stuffed zero and restart markers belong to the scan.
            0x00 | 0xD0..=0xD7 => w.write_all(&[0xFF, next])?,
            marker => return Ok(Some(marker)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::scrub::tests::{decode_rgba, sample_image};
    use image::ImageFormat;
    use std::io::Cursor;

    /// APP1 segment carrying a minimal little-endian EXIF block with `Make = "Cam"`.
    fn exif_app1() -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II*\0");
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x010Fu16.to_le_bytes()); // Make
        tiff.extend_from_slice(&2u16.to_le_bytes()); // ASCII
        tiff.extend_from_slice(&4u32.to_le_bytes());
        tiff.extend_from_slice(b"Cam\0");
        tiff.extend_from_slice(&0u32.to_le_bytes());

        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(&tiff);
        let mut segment = vec![0xFF, 0xE1];
        segment.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        segment.extend_from_slice(&payload);
        segment
    }

    fn com_segment(text: &[u8]) -> Vec<u8> {
        let mut segment = vec![0xFF, COM];
        segment.extend_from_slice(&((text.len() + 2) as u16).to_be_bytes());
        segment.extend_from_slice(text);
        segment
    }

    fn jpeg_with_metadata() -> Vec<u8> {
        let mut clean = Vec::new();
        sample_image()
            .write_to(&mut Cursor::new(&mut clean), ImageFormat::Jpeg)
            .unwrap();
        let mut tagged = clean[..2].to_vec();
        tagged.extend_from_slice(&exif_app1());
        tagged.extend_from_slice(&com_segment(b"shot by alice"));
        tagged.extend_from_slice(&clean[2..]);
        tagged.extend_from_slice(b"trailing junk");
        tagged
    }

    #[test]
    fn test_drops_exif_and_comment() {
        let input = jpeg_with_metadata();
        let mut output = Vec::new();
        let removed = scrub(&mut &input[..], &mut output).unwrap();

        assert_eq!(removed, 2);
        assert!(!output.windows(6).any(|w| w == b"Exif\0\0"));
        assert!(!output.windows(5).any(|w| w == b"alice"));
        assert!(output.ends_with(&[0xFF, EOI]));
    }

    #[test]
    fn test_pixels_unchanged() {
        let input = jpeg_with_metadata();
        let mut output = Vec::new();
        scrub(&mut &input[..], &mut output).unwrap();
        assert_eq!(decode_rgba(&input), decode_rgba(&output));
    }

    #[test]
    fn test_clean_jpeg_is_byte_identical() {
        let mut clean = Vec::new();
        sample_image()
            .write_to(&mut Cursor::new(&mut clean), ImageFormat::Jpeg)
            .unwrap();
        let mut output = Vec::new();
        let removed = scrub(&mut &clean[..], &mut output).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(output, clean);
    }

    #[test]
    fn test_keeps_icc_profile() {
        let mut payload = b"ICC_PROFILE\0\x01\x01".to_vec();
        payload.extend_from_slice(&[0u8; 16]);
        assert!(!is_metadata(APP2, &payload));
        assert!(is_metadata(APP2, b"MPF\0"));
        assert!(!is_metadata(APP0, b"JFIF\0"));
        assert!(is_metadata(0xED, b"Photoshop 3.0\0"));
    }

    #[test]
    fn test_rejects_non_jpeg() {
        let mut output = Vec::new();
        let err = scrub(&mut &b"\x89PNG\r\n\x1a\n"[..], &mut output).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
