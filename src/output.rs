//! CLI output formatting for queries, checks and gallery builds.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every image leads
//! with its position in the gallery and its filename; the source path and
//! capture date follow as indented context lines. Galleries lead with their
//! position, name and photo count.
//!
//! # Output Format
//!
//! ## Query
//!
//! ```text
//! Filter: exif.make == 'Canon'
//! Sort: dateTaken asc, fallback filename
//! 001 dawn.jpg
//!     Source: 010-Landscapes/dawn.jpg
//!     Taken: 2024-03-02 06:12:00
//! 002 harbor.jpg
//!     Source: 020-Travel/harbor.jpg
//!     Taken: 2024-07-14 21:05:00
//!
//! 2 of 8 photos
//! ```
//!
//! ## Check
//!
//! ```text
//! ok
//!     Predicate: (exif.make == 'Canon' and exif.iso >= 800)
//!     Stage: sort dateTaken desc
//!     Stage: limit 5
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 canon (2 photos)
//!     001 dawn.jpg
//!     002 harbor.jpg
//! 002 broken (failed)
//!     Filter parse error at position 15: Unexpected token 'xyz'
//!     Expression: exif.make == xyz
//!                              ^^^
//!
//! Built 1 gallery, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::ast::{CompiledFilter, PipeStage};
use crate::query::GalleryOutcome;
use crate::record::ImageRecord;
use crate::sort::SortSpec;
use std::fmt::Display;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + name, with optional detail.
///
/// ```text
/// 001 canon (5 photos)
/// 002 broken (failed)
/// ```
fn entity_header(index: usize, name: &str, detail: Option<&str>) -> String {
    match detail {
        Some(d) => format!("{} {} ({})", format_index(index), name, d),
        None => format!("{} {}", format_index(index), name),
    }
}

fn photo_count(n: usize) -> String {
    match n {
        1 => "1 photo".to_string(),
        n => format!("{n} photos"),
    }
}

/// Format an image line with its context lines.
///
/// The source path is shown only when it adds something beyond the filename.
///
/// ```text
/// 001 dawn.jpg
///     Source: 010-Landscapes/dawn.jpg
///     Taken: 2024-03-02 06:12:00
/// ```
fn image_lines(index: usize, image: &ImageRecord, depth: usize, detailed: bool) -> Vec<String> {
    let base = indent(depth);
    let mut lines = vec![format!("{}{} {}", base, format_index(index), image.filename)];
    if detailed {
        if !image.source_path.is_empty() && image.source_path != image.filename {
            lines.push(format!("{}    Source: {}", base, image.source_path));
        }
        if let Some(taken) = image.date_taken {
            lines.push(format!("{}    Taken: {}", base, taken.format("%Y-%m-%d %H:%M:%S")));
        }
    }
    lines
}

fn stage_line(stage: &PipeStage) -> String {
    match stage {
        PipeStage::Sort { field, direction } => format!("sort {} {}", field.join("."), direction),
        PipeStage::Limit(n) => format!("limit {n}"),
    }
}

fn sort_line(spec: &SortSpec) -> String {
    match &spec.fallback {
        Some(fb) => format!("Sort: {} {}, fallback {}", spec.field, spec.direction, fb),
        None => format!("Sort: {} {}", spec.field, spec.direction),
    }
}

fn error_lines(err: &dyn Display, depth: usize) -> Vec<String> {
    let base = indent(depth);
    err.to_string()
        .lines()
        .map(|line| format!("{base}{line}"))
        .collect()
}

// ============================================================================
// query
// ============================================================================

/// Format the ordered result of a single query.
pub fn format_query_output(
    filter: &str,
    spec: &SortSpec,
    images: &[&ImageRecord],
    pool_size: usize,
) -> Vec<String> {
    let mut lines = Vec::new();
    if filter.trim().is_empty() {
        lines.push("Filter: (none, whole pool)".to_string());
    } else {
        lines.push(format!("Filter: {}", filter.trim()));
    }
    lines.push(sort_line(spec));
    for (i, image) in images.iter().enumerate() {
        lines.extend(image_lines(i + 1, image, 0, true));
    }
    lines.push(String::new());
    lines.push(format!("{} of {}", images.len(), photo_count(pool_size)));
    lines
}

pub fn print_query_output(
    filter: &str,
    spec: &SortSpec,
    images: &[&ImageRecord],
    pool_size: usize,
) {
    for line in format_query_output(filter, spec, images, pool_size) {
        println!("{}", line);
    }
}

/// Query results as pretty JSON, in the manifest's record format.
pub fn format_query_json(images: &[&ImageRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(images)
}

// ============================================================================
// check
// ============================================================================

/// Format a successfully parsed filter: its normalized predicate and stages.
pub fn format_check_output(filter: &CompiledFilter) -> Vec<String> {
    let mut lines = vec!["ok".to_string()];
    lines.push(format!("{}Predicate: {}", indent(1), filter.predicate));
    for stage in &filter.pipeline {
        lines.push(format!("{}Stage: {}", indent(1), stage_line(stage)));
    }
    lines
}

pub fn print_check_output(filter: &CompiledFilter) {
    for line in format_check_output(filter) {
        println!("{}", line);
    }
}

/// Format any error for display, one output line per error line.
pub fn format_error(err: &dyn Display) -> Vec<String> {
    error_lines(err, 0)
}

pub fn print_error(err: &dyn Display) {
    for line in format_error(err) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

/// Format the outcome of a multi-gallery build.
///
/// Successful galleries list their images; failed ones show the diagnostic
/// indented under the gallery header.
pub fn format_gallery_outcomes(outcomes: &[GalleryOutcome<'_>]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut failed = 0;
    for (i, outcome) in outcomes.iter().enumerate() {
        match &outcome.result {
            Ok(images) => {
                let count = photo_count(images.len());
                lines.push(entity_header(i + 1, &outcome.name, Some(&count)));
                for (j, image) in images.iter().enumerate() {
                    lines.extend(image_lines(j + 1, image, 1, false));
                }
            }
            Err(e) => {
                failed += 1;
                lines.push(entity_header(i + 1, &outcome.name, Some("failed")));
                lines.extend(error_lines(e, 1));
            }
        }
    }
    let built = outcomes.len() - failed;
    let noun = if built == 1 { "gallery" } else { "galleries" };
    lines.push(String::new());
    if failed == 0 {
        lines.push(format!("Built {built} {noun}"));
    } else {
        lines.push(format!("Built {built} {noun}, {failed} failed"));
    }
    lines
}

pub fn print_gallery_outcomes(outcomes: &[GalleryOutcome<'_>]) {
    for line in format_gallery_outcomes(outcomes) {
        println!("{}", line);
    }
}
