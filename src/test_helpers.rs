//! Shared test utilities for the gallery-query test suite.
//!
//! Record builders for the common shapes a filter meets in practice (dated
//! photos, full camera EXIF, raw-only tags) plus a small mixed pool and a few
//! extractors that keep assertions readable.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let pool = sample_pool();
//! let matched = query(&pool, "exif.make == 'Canon'", "", &SortConfig::default()).unwrap();
//! assert_eq!(filenames(&matched), vec!["dawn.jpg", "harbor.jpg"]);
//! ```

use chrono::NaiveDateTime;

use crate::record::{ExifData, ImageRecord};
use crate::value::parse_date;

// =========================================================================
// Record builders
// =========================================================================

/// Parse a date literal. Panics on bad input.
pub fn dt(text: &str) -> NaiveDateTime {
    parse_date(text).unwrap_or_else(|| panic!("bad test date '{text}'"))
}

/// A record with a capture date and nothing else.
pub fn taken(filename: &str, date: &str) -> ImageRecord {
    ImageRecord {
        source_path: format!("photos/{filename}"),
        date_taken: Some(dt(date)),
        ..ImageRecord::new(filename)
    }
}

/// A 6000x4000 landscape shot on a Canon body at the given ISO.
pub fn canon(filename: &str, date: &str, iso: u32) -> ImageRecord {
    ImageRecord {
        width: 6000,
        height: 4000,
        file_size_bytes: 8_400_000,
        exif: Some(ExifData {
            make: Some("Canon".to_string()),
            model: Some("EOS R5".to_string()),
            lens_model: Some("RF24-70mm F2.8 L IS USM".to_string()),
            f_number: Some(2.8),
            exposure_time: Some(0.004),
            focal_length: Some(35.0),
            iso: Some(iso),
            ..ExifData::default()
        }),
        ..taken(filename, date)
    }
}

/// An undated record whose only EXIF is a raw `Rating` tag.
pub fn rated(filename: &str, rating: &str) -> ImageRecord {
    let mut exif = ExifData::default();
    exif.raw.insert("Rating".to_string(), rating.to_string());
    ImageRecord {
        source_path: format!("photos/{filename}"),
        exif: Some(exif),
        ..ImageRecord::new(filename)
    }
}

/// Eight photos covering two camera makes, portrait and landscape, missing
/// dates, missing EXIF and raw ratings.
pub fn sample_pool() -> Vec<ImageRecord> {
    let sony = |filename: &str, date: &str, iso: u32, rating: &str| {
        let mut record = canon(filename, date, iso);
        (record.width, record.height) = (4000, 6000);
        let exif = record.exif.get_or_insert_with(ExifData::default);
        exif.make = Some("SONY".to_string());
        exif.model = Some("ILCE-7M4".to_string());
        exif.focal_length = Some(85.0);
        exif.raw.insert("Rating".to_string(), rating.to_string());
        record
    };
    let mut pool = vec![
        canon("dawn.jpg", "2024-03-02T06:12:00", 100),
        sony("portrait.jpg", "2023-11-20T15:40:00", 400, "5"),
        canon("harbor.jpg", "2024-07-14T21:05:00", 3200),
        sony("street.jpg", "2024-01-09T12:00:00", 1600, "3"),
        taken("scan-1987.jpg", "1987-06-01T00:00:00"),
        ImageRecord::new("untitled.png"),
        rated("favorite.jpg", "4"),
        sony("market.jpg", "2022-05-30T09:30:00", 800, "not rated"),
    ];
    pool[0].exif.get_or_insert_with(ExifData::default).raw.insert("Rating".into(), "4".into());
    pool
}

// =========================================================================
// Extractors
// =========================================================================

/// Filenames in result order.
pub fn filenames<'a>(records: &[&'a ImageRecord]) -> Vec<&'a str> {
    records.iter().map(|r| r.filename.as_str()).collect()
}

/// Find a record by filename. Panics if not found.
pub fn find_record<'a>(pool: &'a [ImageRecord], filename: &str) -> &'a ImageRecord {
    pool.iter()
        .find(|r| r.filename == filename)
        .unwrap_or_else(|| {
            let names: Vec<&str> = pool.iter().map(|r| r.filename.as_str()).collect();
            panic!("record '{filename}' not found. Available: {names:?}")
        })
}
