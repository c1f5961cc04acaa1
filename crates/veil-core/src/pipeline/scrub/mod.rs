//! Metadata stripping.
//!
//! JPEG, PNG, GIF and WebP are filtered at the container level: metadata
//! segments are dropped and every other byte is copied as-is, so pixel data
//! is never re-encoded. TIFF stores metadata in the same IFDs as the image
//! layout, so it is decoded and written back out losslessly instead.
//!
//! Output goes to a temp file next to the destination and is only renamed
//! into place after a second EXIF read finds nothing identifying.

mod gif;
mod jpeg;
mod png;
mod webp;

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use image::{ImageFormat, ImageReader};
use tempfile::NamedTempFile;

use super::metadata::MetadataProbe;
use crate::error::{PipelineError, PipelineResult};

/// Container formats the sanitizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    WebP,
    Tiff,
}

impl ImageKind {
    /// Identify a container from its leading bytes.
    pub fn sniff(header: &[u8]) -> Option<Self> {
        match header {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::WebP),
            [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(Self::Tiff),
            _ => None,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::WebP => "WebP",
            Self::Tiff => "TIFF",
        };
        f.write_str(name)
    }
}

/// What a scrub pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrubReport {
    pub kind: ImageKind,
    /// Segments, chunks or blocks dropped. Zero for TIFF re-encodes.
    pub removed: usize,
}

/// Writes metadata-free copies of image files.
pub struct Sanitizer;

impl Sanitizer {
    /// Write a metadata-free copy of `input` to `output`.
    ///
    /// `output` is replaced atomically; on any error it is left untouched.
    pub fn scrub_file(input: &Path, output: &Path) -> PipelineResult<ScrubReport> {
        let err = |message: String| PipelineError::Sanitize {
            path: input.to_path_buf(),
            message,
        };

        let kind = sniff_file(input).map_err(|e| err(e.to_string()))?;

        let dir = output.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| err(e.to_string()))?;

        let removed = write_scrubbed(kind, input, tmp.as_file_mut())
            .map_err(|e| err(format!("malformed {kind}: {e}")))?;
        tmp.as_file().sync_all().map_err(|e| err(e.to_string()))?;

        let leftover = MetadataProbe::sensitive_fields(tmp.path());
        if !leftover.is_empty() {
            return Err(err(format!(
                "metadata still present after scrub: {}",
                leftover.join(", ")
            )));
        }

        tmp.persist(output).map_err(|e| err(e.error.to_string()))?;

        tracing::debug!(
            "Scrubbed {kind} {:?}: {removed} metadata block(s) removed",
            input.file_name().unwrap_or_default()
        );
        Ok(ScrubReport { kind, removed })
    }
}

fn sniff_file(path: &Path) -> io::Result<ImageKind> {
    let mut header = [0u8; 12];
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < header.len() {
        match file.read(&mut header[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    ImageKind::sniff(&header[..filled]).ok_or_else(|| invalid("unrecognized image format"))
}

fn write_scrubbed(kind: ImageKind, input: &Path, out: &mut File) -> io::Result<usize> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(out);
    let removed = match kind {
        ImageKind::Jpeg => jpeg::scrub(&mut reader, &mut writer)?,
        ImageKind::Png => png::scrub(&mut reader, &mut writer)?,
        ImageKind::Gif => gif::scrub(&mut reader, &mut writer)?,
        ImageKind::WebP => webp::scrub(&mut reader, &mut writer)?,
        ImageKind::Tiff => {
            let img = ImageReader::new(reader)
                .with_guessed_format()?
                .decode()
                .map_err(io::Error::other)?;
            img.write_to(&mut writer, ImageFormat::Tiff)
                .map_err(io::Error::other)?;
            0
        }
    };
    writer.flush()?;
    Ok(removed)
}

fn invalid<E>(msg: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

/// Copy exactly `len` bytes, failing on short input.
fn copy_exact<R: Read, W: Write>(r: &mut R, w: &mut W, len: u64) -> io::Result<()> {
    let copied = io::copy(&mut r.by_ref().take(len), w)?;
    if copied != len {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

/// Discard exactly `len` bytes, failing on short input.
fn skip_exact<R: Read>(r: &mut R, len: u64) -> io::Result<()> {
    copy_exact(r, &mut io::sink(), len)
}
