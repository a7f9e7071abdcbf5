//! # Gallery Query
//!
//! The filter and sort engine behind virtual galleries in a photo portfolio
//! generator. A gallery doesn't have to be "whatever is in this folder": it
//! can be a declarative query over the shared image pool.
//!
//! ```toml
//! [[galleries]]
//! name = "canon-high-iso"
//! filter = "exif.make == 'Canon' and exif.iso >= 800 | sort dateTaken desc | limit 5"
//! ```
//!
//! # Architecture: Compile Once, Evaluate Everywhere
//!
//! ```text
//! filter string ─→ lexer ─→ parser ─→ CompiledFilter (immutable, shareable)
//!                                          │
//! image pool ─→ eval::filter (parallel) ←──┘
//!                    │
//!                    └─→ SortSpec ordering ─→ pipe stages ─→ gallery
//! ```
//!
//! - **Parsing** happens once per distinct filter string. The resulting tree
//!   holds no reference to the pool, so it can be cached ([`query::QueryCache`])
//!   and evaluated from any number of threads.
//! - **Evaluation** is a pure function of one record and the tree. The pool is
//!   filtered in parallel with rayon.
//! - **Ordering** merges the global `[sort]` config with a per-gallery override
//!   and always ends in a filename tie-break, so output is deterministic.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`value`] | Runtime values: string, number, boolean, date, null, raw EXIF text |
//! | [`record`] | `ImageRecord` / `ExifData`, the unit galleries are built from |
//! | [`resolve`] | Property paths (`exif.iso`, `exif.raw.Rating`) to values |
//! | [`lexer`] | Tokenizer with byte offsets for diagnostics |
//! | [`ast`] | Expression tree and pipe stages |
//! | [`parser`] | Recursive-descent parser and caret-rendered `ParseError` |
//! | [`functions`] | The fixed built-in function table |
//! | [`eval`] | Predicate evaluation and pool filtering |
//! | [`pipe`] | `sort` / `limit` stages |
//! | [`sort`] | Sort config, per-gallery overrides, the gallery comparator |
//! | [`query`] | The facade: one call per gallery, plus the compiled-filter cache |
//! | [`config`] | `config.toml` loading, merging, and validation |
//! | [`manifest`] | Loads the image pool JSON |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Typos Fail Loudly
//!
//! A filter that references `exif.isoo` or compares `exif.make > 5` is an
//! error for the whole gallery, never a silently empty or shrunken gallery.
//! Unknown property roots are caught before any image is evaluated, so even
//! an empty pool reports them. Missing *data* is different: `exif.iso >= 800`
//! on a photo without an ISO is simply false.
//!
//! ## Raw EXIF Stays Untyped Until Compared
//!
//! Tags in `exif.raw` have no declared type. They are typed at the comparison
//! site from the other operand, so `exif.raw.Rating >= 4` compares numbers
//! and `exif.raw.Copyright == 'Jane Doe'` compares text. A value that doesn't
//! parse behaves like a missing one.
//!
//! ## Ordinal Everything
//!
//! String comparison, case conversion and sort order never consult the
//! locale. The same pool and config produce byte-identical galleries on any
//! machine.

pub mod ast;
pub mod config;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod manifest;
pub mod output;
pub mod parser;
pub mod pipe;
pub mod query;
pub mod record;
pub mod resolve;
pub mod sort;
pub mod value;

#[cfg(test)]
pub(crate) mod test_helpers;
