//! Property path resolution against an [`ImageRecord`].
//!
//! Paths are dotted identifiers split into segments. The first segment picks
//! the source:
//!
//! | Path | Value |
//! |------|-------|
//! | `filename`, `sourcePath` | string |
//! | `width`, `height`, `fileSize` | number |
//! | `dateTaken` | date, or null when the camera recorded none |
//! | `exif.<field>` | the promoted EXIF field, or null |
//! | `exif.raw.<Tag>` | the raw tag string (untyped), or null |
//!
//! Names are case-sensitive. A path whose root is neither a record field nor
//! `exif` is an error rather than a silent null: `exfi.iso >= 800` should
//! fail the build, not produce an empty gallery.

use crate::eval::EvalError;
use crate::record::ImageRecord;
use crate::value::Value;
use std::borrow::Cow;

/// Record fields addressable by a single-segment path.
pub const DIRECT_FIELDS: &[&str] = &[
    "filename",
    "sourcePath",
    "width",
    "height",
    "fileSize",
    "dateTaken",
];

/// Promoted EXIF fields addressable as `exif.<name>`.
pub const EXIF_FIELDS: &[&str] = &[
    "make",
    "model",
    "lensModel",
    "fNumber",
    "exposureTime",
    "focalLength",
    "iso",
    "gpsLatitude",
    "gpsLongitude",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExifField {
    Make,
    Model,
    LensModel,
    FNumber,
    ExposureTime,
    FocalLength,
    Iso,
    GpsLatitude,
    GpsLongitude,
}

impl ExifField {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "make" => ExifField::Make,
            "model" => ExifField::Model,
            "lensModel" => ExifField::LensModel,
            "fNumber" => ExifField::FNumber,
            "exposureTime" => ExifField::ExposureTime,
            "focalLength" => ExifField::FocalLength,
            "iso" => ExifField::Iso,
            "gpsLatitude" => ExifField::GpsLatitude,
            "gpsLongitude" => ExifField::GpsLongitude,
            _ => return None,
        })
    }
}

/// A structurally valid property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property<'a> {
    Filename,
    SourcePath,
    Width,
    Height,
    FileSize,
    DateTaken,
    Exif(ExifField),
    /// `exif.raw.<Tag>`. Segments after `raw` are rejoined with dots.
    Raw(Cow<'a, str>),
}

/// Split a dotted path (`exif.raw.Rating`) into segments.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

fn dotted(path: &[String]) -> String {
    path.join(".")
}

impl<'a> Property<'a> {
    /// Validate a path without looking at any record.
    pub fn parse(path: &'a [String]) -> Result<Self, EvalError> {
        let Some((root, rest)) = path.split_first() else {
            return Err(EvalError::IncompletePath(String::new()));
        };
        if root == "exif" {
            return Self::parse_exif(path, rest);
        }
        let property = match root.as_str() {
            "filename" => Property::Filename,
            "sourcePath" => Property::SourcePath,
            "width" => Property::Width,
            "height" => Property::Height,
            "fileSize" => Property::FileSize,
            "dateTaken" => Property::DateTaken,
            _ => {
                return Err(EvalError::UnknownRoot {
                    root: root.clone(),
                    path: dotted(path),
                });
            }
        };
        if !rest.is_empty() {
            return Err(EvalError::NotAnObject {
                field: root.clone(),
                path: dotted(path),
            });
        }
        Ok(property)
    }

    fn parse_exif(path: &'a [String], rest: &'a [String]) -> Result<Self, EvalError> {
        match rest {
            [] => Err(EvalError::IncompletePath(dotted(path))),
            [raw] if raw == "raw" => Err(EvalError::IncompletePath(dotted(path))),
            [raw, key] if raw == "raw" && !key.is_empty() => {
                Ok(Property::Raw(Cow::Borrowed(key.as_str())))
            }
            [raw, keys @ ..] if raw == "raw" => {
                if keys.iter().any(String::is_empty) {
                    return Err(EvalError::IncompletePath(dotted(path)));
                }
                Ok(Property::Raw(Cow::Owned(keys.join("."))))
            }
            [field] => ExifField::from_name(field)
                .map(Property::Exif)
                .ok_or_else(|| EvalError::UnknownExifField {
                    field: field.clone(),
                    path: dotted(path),
                }),
            [field, ..] => Err(EvalError::NotAnObject {
                field: format!("exif.{field}"),
                path: dotted(path),
            }),
        }
    }

    /// Read this property from a record.
    pub fn value(&self, record: &ImageRecord) -> Value {
        match self {
            Property::Filename => Value::String(record.filename.clone()),
            Property::SourcePath => Value::String(record.source_path.clone()),
            Property::Width => Value::Number(f64::from(record.width)),
            Property::Height => Value::Number(f64::from(record.height)),
            Property::FileSize => Value::Number(record.file_size_bytes as f64),
            Property::DateTaken => record.date_taken.map_or(Value::Null, Value::DateTime),
            Property::Exif(field) => {
                let Some(exif) = &record.exif else {
                    return Value::Null;
                };
                match field {
                    ExifField::Make => text(exif.make.as_deref()),
                    ExifField::Model => text(exif.model.as_deref()),
                    ExifField::LensModel => text(exif.lens_model.as_deref()),
                    ExifField::FNumber => number(exif.f_number),
                    ExifField::ExposureTime => number(exif.exposure_time),
                    ExifField::FocalLength => number(exif.focal_length),
                    ExifField::Iso => number(exif.iso.map(f64::from)),
                    ExifField::GpsLatitude => number(exif.gps_latitude),
                    ExifField::GpsLongitude => number(exif.gps_longitude),
                }
            }
            Property::Raw(key) => record
                .exif
                .as_ref()
                .and_then(|exif| exif.raw.get(key.as_ref()))
                .filter(|v| !v.trim().is_empty())
                .map_or(Value::Null, |v| Value::Untyped(v.clone())),
        }
    }
}

fn text(value: Option<&str>) -> Value {
    match value {
        Some(s) if !s.is_empty() => Value::String(s.to_string()),
        _ => Value::Null,
    }
}

fn number(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::Number)
}

/// Resolve `path` against `record`.
pub fn resolve(path: &[String], record: &ImageRecord) -> Result<Value, EvalError> {
    Ok(Property::parse(path)?.value(record))
}
