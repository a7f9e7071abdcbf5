//! The image records that galleries are built from.
//!
//! Records arrive already materialized from the processing stage (dimensions,
//! file size, EXIF extraction happen there). The engine only reads them.
//!
//! Field names serialize in camelCase so the manifest JSON uses the same
//! names as filter property paths: `dateTaken` in the manifest is
//! `dateTaken` in `filter = "dateTaken >= '2024-01-01'"`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One photo in the shared image pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// File name, unique within its source directory. Final sort tie-break.
    pub filename: String,
    /// Path of the source image relative to the content root.
    #[serde(default)]
    pub source_path: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default, rename = "fileSize")]
    pub file_size_bytes: u64,
    /// Capture time from EXIF `DateTimeOriginal`, if the camera recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_taken: Option<NaiveDateTime>,
    /// Images without EXIF still participate; every `exif.*` path is null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifData>,
}

/// EXIF fields promoted to first-class properties, plus the raw tag map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_number: Option<f64>,
    /// Exposure time in seconds (`1/250` is `0.004`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_time: Option<f64>,
    /// Focal length in millimetres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_longitude: Option<f64>,
    /// Additional tags keyed by their exact, case-sensitive EXIF tag name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub raw: BTreeMap<String, String>,
}

impl ImageRecord {
    /// A record with only a filename; every other property is zero or absent.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }
}
