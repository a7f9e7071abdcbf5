//! Pipe stages that run after the gallery sort.
//!
//! ```text
//! exif.make == 'Canon' | sort exif.iso desc | limit 12
//!                      └────── stages, left to right ──────┘
//! ```
//!
//! A `sort` stage reorders by one property using the same comparator as the
//! gallery sort (nulls last, filename then source path as tie-breaks) but
//! without the global fallback. `limit n` keeps the first `n` images.

use crate::ast::PipeStage;
use crate::eval::EvalError;
use crate::record::ImageRecord;
use crate::sort::sort_records;

/// Run `stages` over `records` in order.
pub fn apply<'a>(
    stages: &[PipeStage],
    mut records: Vec<&'a ImageRecord>,
) -> Result<Vec<&'a ImageRecord>, EvalError> {
    for stage in stages {
        match stage {
            PipeStage::Sort { field, direction } => {
                sort_records(&mut records, field, *direction, None)?;
            }
            PipeStage::Limit(n) => records.truncate(*n),
        }
    }
    Ok(records)
}
