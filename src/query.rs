//! Gallery query facade: the one call the rest of a site build needs.
//!
//! ```text
//! filter string ──parse──→ CompiledFilter ─┐
//! sort override ─┐                        │
//! [sort] config ─┴─resolve─→ SortSpec ────┤
//! image pool ─────────────────────────────┴→ filter → sort → pipe stages → gallery
//! ```
//!
//! An empty filter is a traditional gallery: the whole pool, ordered by the
//! resolved sort. A filter selects from the pool first. Either way the
//! [`SortSpec`] is applied before any `| sort` or `| limit` stage, so
//! `limit` without an explicit `sort` keeps the first images in gallery order.
//!
//! ## Caching
//!
//! [`QueryCache`] memoizes compiled filters by their source string. Entries
//! are published once and never replaced: concurrent gallery builds that
//! race on the same filter both compile it, and the first insert wins.
//! Compile errors are not cached.
//!
//! ## Gallery isolation
//!
//! [`build_galleries`] runs every configured gallery in parallel and returns
//! one outcome per gallery. A broken filter fails its own gallery only.

use crate::ast::CompiledFilter;
use crate::config::GalleryConfig;
use crate::eval::{self, EvalError};
use crate::parser::{ParseError, parse};
use crate::pipe;
use crate::record::ImageRecord;
use crate::sort::{SortConfig, SortError, SortOverride, SortSpec};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("Filter evaluation error: {0}")]
    Evaluation(#[from] EvalError),
    #[error("Sort configuration error: {0}")]
    Configuration(#[from] SortError),
}

/// Parse a filter and check every property path it references.
pub fn compile(filter: &str) -> Result<CompiledFilter, QueryError> {
    let compiled = parse(filter)?;
    eval::check_properties(&compiled)?;
    debug!(filter, stages = compiled.pipeline.len(), "compiled filter");
    Ok(compiled)
}

/// Merge the global sort config with an optional `field[:direction]` override.
pub fn resolve_sort(sort_override: &str, global: &SortConfig) -> Result<SortSpec, QueryError> {
    let gallery = SortOverride::parse(sort_override)?;
    Ok(SortSpec::resolve(global, gallery.as_ref())?)
}

/// Build one gallery from `pool`.
///
/// `filter` may be empty (every image) or a full filter expression.
/// `sort_override` may be empty (global sort) or `field[:direction]`.
pub fn query<'a>(
    pool: &'a [ImageRecord],
    filter: &str,
    sort_override: &str,
    global: &SortConfig,
) -> Result<Vec<&'a ImageRecord>, QueryError> {
    let compiled = if filter.trim().is_empty() {
        None
    } else {
        Some(compile(filter)?)
    };
    let spec = resolve_sort(sort_override, global)?;
    Ok(run(pool, compiled.as_ref(), &spec)?)
}

/// Run an already compiled filter (or none, for a traditional gallery).
pub fn run<'a>(
    pool: &'a [ImageRecord],
    filter: Option<&CompiledFilter>,
    spec: &SortSpec,
) -> Result<Vec<&'a ImageRecord>, EvalError> {
    let mut records = match filter {
        Some(f) => eval::filter(&f.predicate, pool)?,
        None => pool.iter().collect(),
    };
    spec.sort(&mut records)?;
    match filter {
        Some(f) => pipe::apply(&f.pipeline, records),
        None => Ok(records),
    }
}

/// Compiled filters keyed by source string.
#[derive(Debug, Default)]
pub struct QueryCache {
    compiled: RwLock<HashMap<String, Arc<CompiledFilter>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached compilation of `filter`, compiling it on first use.
    pub fn get_or_compile(&self, filter: &str) -> Result<Arc<CompiledFilter>, QueryError> {
        if let Some(hit) = self
            .compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(filter)
        {
            debug!(filter, "filter served from cache");
            return Ok(Arc::clone(hit));
        }

        let fresh = Arc::new(compile(filter)?);
        let mut map = self.compiled.write().unwrap_or_else(PoisonError::into_inner);
        let published = map.entry(filter.to_string()).or_insert(fresh);
        Ok(Arc::clone(published))
    }

    pub fn len(&self) -> usize {
        self.compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same as [`query`], compiling through the cache.
    pub fn query<'a>(
        &self,
        pool: &'a [ImageRecord],
        filter: &str,
        sort_override: &str,
        global: &SortConfig,
    ) -> Result<Vec<&'a ImageRecord>, QueryError> {
        let compiled = if filter.trim().is_empty() {
            None
        } else {
            Some(self.get_or_compile(filter)?)
        };
        let spec = resolve_sort(sort_override, global)?;
        Ok(run(pool, compiled.as_deref(), &spec)?)
    }
}

/// The result of building one configured gallery.
#[derive(Debug)]
pub struct GalleryOutcome<'a> {
    pub name: String,
    pub result: Result<Vec<&'a ImageRecord>, QueryError>,
}

impl GalleryOutcome<'_> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Build every gallery against the shared pool, in parallel.
///
/// Outcomes come back in configuration order.
pub fn build_galleries<'a>(
    pool: &'a [ImageRecord],
    galleries: &[GalleryConfig],
    global: &SortConfig,
    cache: &QueryCache,
) -> Vec<GalleryOutcome<'a>> {
    galleries
        .par_iter()
        .map(|gallery| {
            let result = cache.query(
                pool,
                &gallery.filter,
                gallery.sort.as_deref().unwrap_or(""),
                global,
            );
            match &result {
                Ok(images) => {
                    debug!(gallery = %gallery.name, images = images.len(), "built gallery")
                }
                Err(e) => warn!(gallery = %gallery.name, error = %e, "gallery failed"),
            }
            GalleryOutcome {
                name: gallery.name.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortDirection;
    use crate::test_helpers::*;

    fn names<'a>(result: Result<Vec<&'a ImageRecord>, QueryError>) -> Vec<&'a str> {
        filenames(&result.unwrap())
    }

    fn gallery(name: &str, filter: &str, sort: Option<&str>) -> GalleryConfig {
        GalleryConfig {
            name: name.to_string(),
            filter: filter.to_string(),
            sort: sort.map(str::to_string),
        }
    }

    // =========================================================================
    // query()
    // =========================================================================

    #[test]
    fn traditional_gallery_is_whole_pool_sorted() {
        let pool = sample_pool();
        let got = names(query(&pool, "", "", &SortConfig::default()));
        // dated photos by date, then the undated ones by filename fallback
        assert_eq!(
            got,
            vec![
                "scan-1987.jpg",
                "market.jpg",
                "portrait.jpg",
                "street.jpg",
                "dawn.jpg",
                "harbor.jpg",
                "favorite.jpg",
                "untitled.png",
            ]
        );
    }

    #[test]
    fn filter_then_sort() {
        let pool = sample_pool();
        let got = names(query(&pool, "exif.make == 'SONY'", "", &SortConfig::default()));
        assert_eq!(got, vec!["market.jpg", "portrait.jpg", "street.jpg"]);
    }

    #[test]
    fn sort_override_applies_to_filtered_gallery() {
        let pool = sample_pool();
        let got = names(query(
            &pool,
            "exif.make == 'SONY'",
            "exif.iso:desc",
            &SortConfig::default(),
        ));
        assert_eq!(got, vec!["street.jpg", "market.jpg", "portrait.jpg"]);
    }

    #[test]
    fn limit_keeps_first_in_gallery_order() {
        let pool = sample_pool();
        let global = SortConfig {
            direction: SortDirection::Desc,
            ..SortConfig::default()
        };
        let got = names(query(&pool, "exif.iso >= 400 | limit 2", "", &global));
        assert_eq!(got, vec!["harbor.jpg", "street.jpg"]);
    }

    #[test]
    fn documented_example_query() {
        let pool = sample_pool();
        let got = names(query(
            &pool,
            "exif.make == 'Canon' and exif.iso >= 800 | sort dateTaken desc | limit 5",
            "",
            &SortConfig::default(),
        ));
        assert_eq!(got, vec!["harbor.jpg"]);
    }

    #[test]
    fn raw_rating_query() {
        let pool = sample_pool();
        let got = names(query(
            &pool,
            "exif.raw.Rating >= 4 | sort exif.raw.Rating desc",
            "",
            &SortConfig::default(),
        ));
        assert_eq!(got, vec!["portrait.jpg", "dawn.jpg", "favorite.jpg"]);
        let market = find_record(&pool, "market.jpg");
        assert_eq!(market.exif.as_ref().unwrap().raw["Rating"], "not rated");
    }

    #[test]
    fn parse_error_is_reported_with_caret() {
        let pool = sample_pool();
        let err = query(&pool, "exif.make == xyz", "", &SortConfig::default()).unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)));
        assert!(err.to_string().starts_with("Filter parse error at position 15"));
    }

    #[test]
    fn unknown_root_fails_even_on_empty_pool() {
        let err = query(&[], "bogus.field == 1", "", &SortConfig::default()).unwrap_err();
        match err {
            QueryError::Evaluation(EvalError::UnknownRoot { root, .. }) => {
                assert_eq!(root, "bogus")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_sort_override_is_configuration_error() {
        let pool = sample_pool();
        let err = query(&pool, "all", "takenAt", &SortConfig::default()).unwrap_err();
        assert!(matches!(err, QueryError::Configuration(SortError::UnknownField { .. })));
        let err = query(&pool, "all", "filename:up", &SortConfig::default()).unwrap_err();
        assert!(matches!(err, QueryError::Configuration(SortError::InvalidDirection(_))));
    }

    #[test]
    fn evaluation_error_names_the_image() {
        let pool = sample_pool();
        let err = query(&pool, "exif.make > 3", "", &SortConfig::default()).unwrap_err();
        assert!(err.to_string().contains("dawn.jpg"));
    }

    // =========================================================================
    // QueryCache
    // =========================================================================

    #[test]
    fn cache_compiles_once() {
        let cache = QueryCache::new();
        assert!(cache.is_empty());
        let a = cache.get_or_compile("exif.iso >= 800").unwrap();
        let b = cache.get_or_compile("exif.iso >= 800").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_does_not_store_errors() {
        let cache = QueryCache::new();
        assert!(cache.get_or_compile("exif.make ==").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn cached_query_matches_uncached() {
        let pool = sample_pool();
        let cache = QueryCache::new();
        let global = SortConfig::default();
        for filter in ["", "all | limit 3", "width > height", "year(dateTaken) == 2024"] {
            assert_eq!(
                names(cache.query(&pool, filter, "", &global)),
                names(query(&pool, filter, "", &global)),
                "{filter}"
            );
        }
        // the empty filter never touches the cache
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn cache_is_shared_across_threads() {
        let pool = sample_pool();
        let cache = QueryCache::new();
        let global = SortConfig::default();
        let counts: Vec<usize> = (0..16)
            .into_par_iter()
            .map(|_| cache.query(&pool, "exif.make == 'Canon'", "", &global).unwrap().len())
            .collect();
        assert!(counts.iter().all(|&n| n == 2));
        assert_eq!(cache.len(), 1);
    }

    // =========================================================================
    // build_galleries()
    // =========================================================================

    #[test]
    fn failing_gallery_does_not_stop_siblings() {
        let pool = sample_pool();
        let galleries = vec![
            gallery("canon", "exif.make == 'Canon'", None),
            gallery("broken", "exif.make == xyz", None),
            gallery("everything", "", Some("filename")),
        ];
        let outcomes =
            build_galleries(&pool, &galleries, &SortConfig::default(), &QueryCache::new());
        let order: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(order, vec!["canon", "broken", "everything"]);
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        let everything = outcomes[2].result.as_ref().unwrap();
        assert_eq!(everything.len(), pool.len());
        assert_eq!(everything[0].filename, "dawn.jpg");
    }
}
