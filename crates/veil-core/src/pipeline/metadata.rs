//! EXIF inspection, used to report what a file carries and to verify that
//! scrubbing left nothing identifying behind.

use exif::{Context, In, Reader, Tag};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Primary-IFD tags that identify a device, a person or a moment.
const SENSITIVE_PRIMARY_TAGS: [Tag; 7] = [
    Tag::Make,
    Tag::Model,
    Tag::Artist,
    Tag::Copyright,
    Tag::DateTime,
    Tag::ImageDescription,
    Tag(Context::Tiff, 0x13c), // HostComputer; no named constant in kamadak-exif 0.5
];

/// Reads EXIF metadata from image files.
pub struct MetadataProbe;

impl MetadataProbe {
    /// Names of identifying EXIF fields present in the file.
    ///
    /// Structural TIFF tags (dimensions, strip layout, compression) are not
    /// reported. Containers kamadak-exif cannot parse, and files without
    /// EXIF, yield an empty list.
    pub fn sensitive_fields(path: &Path) -> Vec<String> {
        let Ok(file) = File::open(path) else {
            return vec![];
        };
        let mut reader = BufReader::new(file);
        let Ok(exif) = Reader::new().read_from_container(&mut reader) else {
            return vec![];
        };

        exif.fields()
            .filter(|f| {
                matches!(f.tag.context(), Context::Exif | Context::Gps)
                    || (f.ifd_num == In::PRIMARY && SENSITIVE_PRIMARY_TAGS.contains(&f.tag))
            })
            .map(|f| f.tag.to_string())
            .collect()
    }

    /// Whether any identifying EXIF field is present.
    pub fn has_sensitive_fields(path: &Path) -> bool {
        !Self::sensitive_fields(path).is_empty()
    }
}
