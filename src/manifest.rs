//! Image pool loading.
//!
//! The processing stage writes every photo it extracted metadata from into a
//! JSON manifest. Galleries are queries over that pool, so the pool is read
//! once and shared by every gallery build.
//!
//! ```json
//! {
//!   "images": [
//!     {
//!       "filename": "IMG_0042.jpg",
//!       "sourcePath": "010-Landscapes/IMG_0042.jpg",
//!       "width": 6000,
//!       "height": 4000,
//!       "fileSize": 8400000,
//!       "dateTaken": "2024-03-02T06:12:00",
//!       "exif": { "make": "Canon", "iso": 100, "raw": { "Rating": "4" } }
//!     }
//!   ]
//! }
//! ```
//!
//! A bare array of records is accepted too.

use crate::record::ImageRecord;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct PoolDocument {
    images: Vec<ImageRecord>,
}

/// Parse a manifest document into the image pool.
pub fn parse_pool(json: &str) -> Result<Vec<ImageRecord>, ManifestError> {
    if json.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(json)?);
    }
    let document: PoolDocument = serde_json::from_str(json)?;
    Ok(document.images)
}

/// Read the manifest at `path`.
pub fn load_pool(path: &Path) -> Result<Vec<ImageRecord>, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_pool(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::dt;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "images": [
            {
                "filename": "IMG_0042.jpg",
                "sourcePath": "010-Landscapes/IMG_0042.jpg",
                "width": 6000,
                "height": 4000,
                "fileSize": 8400000,
                "dateTaken": "2024-03-02T06:12:00",
                "exif": {
                    "make": "Canon",
                    "lensModel": "RF24-70mm F2.8 L IS USM",
                    "fNumber": 2.8,
                    "iso": 100,
                    "gpsLatitude": -33.86,
                    "raw": { "Rating": "4" }
                }
            },
            { "filename": "scan.png" }
        ]
    }"#;

    #[test]
    fn parses_wrapped_document() {
        let pool = parse_pool(MANIFEST).unwrap();
        assert_eq!(pool.len(), 2);
        let first = &pool[0];
        assert_eq!(first.source_path, "010-Landscapes/IMG_0042.jpg");
        assert_eq!(first.file_size_bytes, 8_400_000);
        assert_eq!(first.date_taken, Some(dt("2024-03-02T06:12:00")));
        let exif = first.exif.as_ref().unwrap();
        assert_eq!(exif.lens_model.as_deref(), Some("RF24-70mm F2.8 L IS USM"));
        assert_eq!(exif.f_number, Some(2.8));
        assert_eq!(exif.gps_latitude, Some(-33.86));
        assert_eq!(exif.raw["Rating"], "4");
    }

    #[test]
    fn missing_fields_default() {
        let pool = parse_pool(MANIFEST).unwrap();
        let scan = &pool[1];
        assert_eq!(scan.width, 0);
        assert_eq!(scan.date_taken, None);
        assert!(scan.exif.is_none());
    }

    #[test]
    fn parses_bare_array() {
        let pool = parse_pool(r#"[{ "filename": "a.jpg" }, { "filename": "b.jpg" }]"#).unwrap();
        let names: Vec<&str> = pool.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn empty_pool() {
        assert!(parse_pool(r#"{ "images": [] }"#).unwrap().is_empty());
        assert!(parse_pool("[]").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_error() {
        assert!(matches!(parse_pool("{ not json"), Err(ManifestError::Json(_))));
        assert!(matches!(
            parse_pool(r#"{ "photos": [] }"#),
            Err(ManifestError::Json(_))
        ));
        // record missing its filename
        assert!(parse_pool(r#"{ "images": [{ "width": 10 }] }"#).is_err());
    }

    #[test]
    fn load_pool_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        fs::write(&path, MANIFEST).unwrap();
        assert_eq!(load_pool(&path).unwrap().len(), 2);
    }

    #[test]
    fn load_pool_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_pool(&tmp.path().join("nope.json"));
        assert!(matches!(result, Err(ManifestError::Io(_))));
    }
}
