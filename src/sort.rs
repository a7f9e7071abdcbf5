//! Sort resolution: the final image order of every gallery.
//!
//! Ordering is decided once per gallery from three sources:
//!
//! ```text
//! [sort] in config.toml         field = "dateTaken", direction = "asc", fallback = "filename"
//!   ← gallery sort override     sort = "exif.focalLength"        (field only)
//!                               sort = "exif.focalLength:desc"   (field and direction)
//!   = SortSpec                  field, direction, fallback
//! ```
//!
//! The fallback always comes from the global config. It is the sort key for
//! any image whose primary field is null, so photos without a capture date
//! still land in a predictable place.
//!
//! ## Comparator
//!
//! 1. Compare effective keys (primary, or fallback when the primary is null)
//!    in the resolved direction. Nulls go last in both directions.
//! 2. Break ties by `filename` ascending, then `sourcePath` ascending, both
//!    ordinal.
//!
//! The result is a total order: the same pool produces the same gallery no
//! matter the input order or the platform's string collation.

use crate::eval::EvalError;
use crate::record::ImageRecord;
use crate::resolve::{Property, resolve, split_path};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Configuration error in a sort field or override.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SortError {
    #[error("Unknown sort field '{field}': {source}")]
    UnknownField { field: String, source: EvalError },
    #[error("Invalid sort direction '{0}' (expected 'asc' or 'desc')")]
    InvalidDirection(String),
    #[error("Missing sort field in '{0}'")]
    MissingField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(SortError::InvalidDirection(s.to_string()))
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        })
    }
}

/// Global sort settings, the `[sort]` table of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SortConfig {
    /// Primary sort field for every gallery unless overridden.
    pub field: String,
    pub direction: SortDirection,
    /// Sort key for images whose primary field is null. Empty disables it.
    pub fallback: String,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            field: "dateTaken".to_string(),
            direction: SortDirection::Asc,
            fallback: "filename".to_string(),
        }
    }
}

/// A per-gallery `sort = "field[:direction]"` override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOverride {
    pub field: String,
    /// `None` keeps the global direction.
    pub direction: Option<SortDirection>,
}

impl SortOverride {
    /// Parse an override string. Empty or whitespace-only means no override.
    pub fn parse(text: &str) -> Result<Option<Self>, SortError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let (field, direction) = match text.split_once(':') {
            Some((field, direction)) => (field.trim(), Some(direction.parse()?)),
            None => (text, None),
        };
        if field.is_empty() {
            return Err(SortError::MissingField(text.to_string()));
        }
        Ok(Some(SortOverride {
            field: field.to_string(),
            direction,
        }))
    }
}

/// The resolved ordering for one gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
    pub fallback: Option<String>,
}

fn check_field(field: &str) -> Result<(), SortError> {
    let path = split_path(field);
    Property::parse(&path)
        .map(|_| ())
        .map_err(|source| SortError::UnknownField {
            field: field.to_string(),
            source,
        })
}

impl SortSpec {
    /// Merge global settings with an optional gallery override.
    ///
    /// Both the field and the fallback must name real properties.
    pub fn resolve(global: &SortConfig, gallery: Option<&SortOverride>) -> Result<Self, SortError> {
        let (field, direction) = match gallery {
            None => (global.field.trim(), global.direction),
            Some(o) => (o.field.as_str(), o.direction.unwrap_or(global.direction)),
        };
        if field.is_empty() {
            return Err(SortError::MissingField(field.to_string()));
        }
        check_field(field)?;
        let fallback = match global.fallback.trim() {
            "" => None,
            fb => {
                check_field(fb)?;
                Some(fb.to_string())
            }
        };
        let spec = SortSpec {
            field: field.to_string(),
            direction,
            fallback,
        };
        debug!(
            field = %spec.field,
            direction = %spec.direction,
            fallback = ?spec.fallback,
            "resolved sort spec"
        );
        Ok(spec)
    }

    /// Order `records` in place.
    pub fn sort(&self, records: &mut [&ImageRecord]) -> Result<(), EvalError> {
        let primary = split_path(&self.field);
        let fallback = self.fallback.as_deref().map(split_path);
        sort_records(records, &primary, self.direction, fallback.as_deref())
    }
}

/// Sort by the property at `primary`, falling back to `fallback` for nulls,
/// with the filename and source path as tie-breaks.
pub fn sort_records(
    records: &mut [&ImageRecord],
    primary: &[String],
    direction: SortDirection,
    fallback: Option<&[String]>,
) -> Result<(), EvalError> {
    let mut keyed = records
        .iter()
        .map(|&record| {
            let mut key = resolve(primary, record)?;
            if let (true, Some(fb)) = (key.is_null(), fallback) {
                key = resolve(fb, record)?;
            }
            Ok((key.into_sort_key(), record))
        })
        .collect::<Result<Vec<(Value, &ImageRecord)>, EvalError>>()?;

    keyed.sort_by(|(ka, a), (kb, b)| {
        compare_keys(ka, kb, direction)
            .then_with(|| a.filename.cmp(&b.filename))
            .then_with(|| a.source_path.cmp(&b.source_path))
    });

    for (slot, (_, record)) in records.iter_mut().zip(keyed) {
        *slot = record;
    }
    Ok(())
}

/// Direction only orders keys of the same kind. Kind groups (dates before
/// the text of a filename fallback, for instance) and nulls keep a fixed
/// place, so undated images trail dated ones whichever way a gallery runs.
fn compare_keys(a: &Value, b: &Value, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if a.sort_rank() == b.sort_rank() => direction.apply(a.sort_cmp(b)),
        (false, false) => a.sort_cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn global(field: &str, direction: SortDirection) -> SortConfig {
        SortConfig {
            field: field.to_string(),
            direction,
            fallback: "filename".to_string(),
        }
    }

    fn sorted<'a>(spec: &SortSpec, pool: &'a [ImageRecord]) -> Vec<&'a str> {
        let mut records: Vec<&ImageRecord> = pool.iter().collect();
        spec.sort(&mut records).unwrap();
        records.iter().map(|r| r.filename.as_str()).collect()
    }

    // =========================================================================
    // Override parsing
    // =========================================================================

    #[test]
    fn override_field_only() {
        assert_eq!(
            SortOverride::parse("exif.focalLength").unwrap(),
            Some(SortOverride {
                field: "exif.focalLength".into(),
                direction: None
            })
        );
    }

    #[test]
    fn override_field_and_direction() {
        assert_eq!(
            SortOverride::parse(" filename : DESC ").unwrap(),
            Some(SortOverride {
                field: "filename".into(),
                direction: Some(SortDirection::Desc)
            })
        );
    }

    #[test]
    fn empty_override_is_none() {
        assert_eq!(SortOverride::parse("").unwrap(), None);
        assert_eq!(SortOverride::parse("   ").unwrap(), None);
    }

    #[test]
    fn invalid_override_direction() {
        assert_eq!(
            SortOverride::parse("filename:sideways"),
            Err(SortError::InvalidDirection("sideways".into()))
        );
        assert!(SortOverride::parse("filename:").is_err());
        assert!(matches!(
            SortOverride::parse(":desc"),
            Err(SortError::MissingField(_))
        ));
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn no_override_uses_global_verbatim() {
        let spec = SortSpec::resolve(&global("dateTaken", SortDirection::Desc), None).unwrap();
        assert_eq!(
            spec,
            SortSpec {
                field: "dateTaken".into(),
                direction: SortDirection::Desc,
                fallback: Some("filename".into())
            }
        );
    }

    #[test]
    fn field_only_override_keeps_global_direction() {
        let o = SortOverride::parse("exif.focalLength").unwrap();
        let spec =
            SortSpec::resolve(&global("dateTaken", SortDirection::Desc), o.as_ref()).unwrap();
        assert_eq!(spec.field, "exif.focalLength");
        assert_eq!(spec.direction, SortDirection::Desc);
        assert_eq!(spec.fallback.as_deref(), Some("filename"));
    }

    #[test]
    fn full_override_replaces_both() {
        let o = SortOverride::parse("width:asc").unwrap();
        let spec =
            SortSpec::resolve(&global("dateTaken", SortDirection::Desc), o.as_ref()).unwrap();
        assert_eq!(spec.field, "width");
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn empty_fallback_disables_it() {
        let mut config = SortConfig::default();
        config.fallback = String::new();
        assert_eq!(SortSpec::resolve(&config, None).unwrap().fallback, None);
    }

    #[test]
    fn unknown_field_is_configuration_error() {
        let o = SortOverride::parse("takenAt").unwrap();
        let err = SortSpec::resolve(&SortConfig::default(), o.as_ref()).unwrap_err();
        assert!(matches!(err, SortError::UnknownField { ref field, .. } if field == "takenAt"));
        assert!(err.to_string().contains("takenAt"));
    }

    #[test]
    fn unknown_fallback_is_configuration_error() {
        let mut config = SortConfig::default();
        config.fallback = "exif.shutter".into();
        assert!(SortSpec::resolve(&config, None).is_err());
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    #[test]
    fn sorts_by_date_in_both_directions() {
        let pool = vec![
            taken("b.jpg", "2024-03-01T00:00:00"),
            taken("a.jpg", "2024-01-01T00:00:00"),
            taken("c.jpg", "2024-02-01T00:00:00"),
        ];
        let asc = SortSpec::resolve(&global("dateTaken", SortDirection::Asc), None).unwrap();
        assert_eq!(sorted(&asc, &pool), vec!["a.jpg", "c.jpg", "b.jpg"]);
        let desc = SortSpec::resolve(&global("dateTaken", SortDirection::Desc), None).unwrap();
        assert_eq!(sorted(&desc, &pool), vec!["b.jpg", "c.jpg", "a.jpg"]);
    }

    #[test]
    fn null_primary_uses_fallback() {
        let mut config = global("exif.iso", SortDirection::Asc);
        config.fallback = "width".into();
        let mut wide = ImageRecord::new("wide.jpg");
        wide.width = 50;
        let mut narrow = ImageRecord::new("narrow.jpg");
        narrow.width = 10;
        let pool = vec![wide, canon("iso.jpg", "2024-01-01T00:00:00", 800), narrow];
        let spec = SortSpec::resolve(&config, None).unwrap();
        // numbers compare across the primary and fallback keys
        assert_eq!(sorted(&spec, &pool), vec!["narrow.jpg", "wide.jpg", "iso.jpg"]);
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        let mut config = global("dateTaken", SortDirection::Asc);
        config.fallback = String::new();
        let pool = vec![
            ImageRecord::new("undated.jpg"),
            taken("old.jpg", "2020-01-01T00:00:00"),
            taken("new.jpg", "2024-01-01T00:00:00"),
        ];
        let spec = SortSpec::resolve(&config, None).unwrap();
        assert_eq!(sorted(&spec, &pool), vec!["old.jpg", "new.jpg", "undated.jpg"]);
        config.direction = SortDirection::Desc;
        let spec = SortSpec::resolve(&config, None).unwrap();
        assert_eq!(sorted(&spec, &pool), vec!["new.jpg", "old.jpg", "undated.jpg"]);
    }

    #[test]
    fn fallback_keyed_images_trail_in_both_directions() {
        let pool = vec![
            ImageRecord::new("scan.jpg"),
            taken("old.jpg", "2020-01-01T00:00:00"),
            ImageRecord::new("archive.jpg"),
            taken("new.jpg", "2024-01-01T00:00:00"),
        ];
        let desc = SortSpec::resolve(&global("dateTaken", SortDirection::Desc), None).unwrap();
        assert_eq!(
            sorted(&desc, &pool),
            vec!["new.jpg", "old.jpg", "scan.jpg", "archive.jpg"]
        );
        let asc = SortSpec::resolve(&global("dateTaken", SortDirection::Asc), None).unwrap();
        assert_eq!(
            sorted(&asc, &pool),
            vec!["old.jpg", "new.jpg", "archive.jpg", "scan.jpg"]
        );
    }

    #[test]
    fn ties_break_by_filename_ascending_even_when_descending() {
        let pool = vec![
            taken("c.jpg", "2024-01-01T00:00:00"),
            taken("a.jpg", "2024-01-01T00:00:00"),
            taken("b.jpg", "2024-01-01T00:00:00"),
        ];
        let spec = SortSpec::resolve(&global("dateTaken", SortDirection::Desc), None).unwrap();
        assert_eq!(sorted(&spec, &pool), vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn ordering_is_independent_of_input_order() {
        let mut pool = vec![
            ImageRecord::new("z.jpg"),
            taken("m.jpg", "2024-01-01T00:00:00"),
            ImageRecord::new("a.jpg"),
            rated("r.jpg", "3"),
        ];
        let spec = SortSpec::resolve(&SortConfig::default(), None).unwrap();
        let forward = sorted(&spec, &pool).join(",");
        pool.reverse();
        assert_eq!(sorted(&spec, &pool).join(","), forward);
    }

    #[test]
    fn same_filename_breaks_by_source_path() {
        let mut a = ImageRecord::new("001.jpg");
        a.source_path = "020-Travel/001.jpg".into();
        let mut b = ImageRecord::new("001.jpg");
        b.source_path = "010-Landscapes/001.jpg".into();
        let pool = vec![a, b];
        let spec = SortSpec::resolve(&SortConfig::default(), None).unwrap();
        let mut records: Vec<&ImageRecord> = pool.iter().collect();
        spec.sort(&mut records).unwrap();
        assert_eq!(records[0].source_path, "010-Landscapes/001.jpg");
    }

    #[test]
    fn raw_ratings_sort_numerically() {
        let pool = vec![rated("ten.jpg", "10"), rated("nine.jpg", "9")];
        let spec = SortSpec::resolve(&global("exif.raw.Rating", SortDirection::Asc), None).unwrap();
        assert_eq!(sorted(&spec, &pool), vec!["nine.jpg", "ten.jpg"]);
    }
}
