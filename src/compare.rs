//! Run every registered filter over one input and collect the results.
//!
//! Filters run concurrently on the rayon pool and are joined before the call
//! returns. A failing filter drops out of the results and shows up in
//! [`ComparisonResult::diagnostics`]; the remaining filters are unaffected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::catalog::{FilterCatalog, FilterParameters};
use crate::error::{DenoiseError, Result};
use crate::raster::RasterBuffer;

/// Shared flag that stops filters which have not started yet.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// One filter that did not produce an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterFailure {
    pub filter_id: String,
    pub kind: &'static str,
    pub error: String,
}

impl FilterFailure {
    fn new(filter_id: &str, err: &DenoiseError) -> Self {
        Self {
            filter_id: filter_id.to_string(),
            kind: err.kind(),
            error: err.to_string(),
        }
    }
}

/// Outputs in catalog order plus any per-filter failures.
#[derive(Debug, Clone, Default)]
pub struct ComparisonResult {
    pub results: Vec<(String, RasterBuffer)>,
    pub diagnostics: Vec<FilterFailure>,
}

impl ComparisonResult {
    pub fn get(&self, id: &str) -> Option<&RasterBuffer> {
        self.results.iter().find(|(k, _)| k == id).map(|(_, r)| r)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|(k, _)| k.as_str())
    }
}

/// Apply every catalog filter with default parameters.
///
/// # Errors
/// Only input errors (`EmptyImage`) abort the batch; everything else is
/// reported per filter.
pub fn compare_all(catalog: &FilterCatalog, input: &RasterBuffer) -> Result<ComparisonResult> {
    compare_all_with_cancel(catalog, input, &CancellationToken::new())
}

pub fn compare_all_with_cancel(
    catalog: &FilterCatalog,
    input: &RasterBuffer,
    cancel: &CancellationToken,
) -> Result<ComparisonResult> {
    input.ensure_not_empty()?;

    let ids: Vec<&'static str> = catalog.list().map(|d| d.id).collect();
    let outcomes: Vec<(&'static str, Result<RasterBuffer>)> = ids
        .par_iter()
        .map(|&id| {
            if cancel.is_cancelled() {
                return (id, Err(DenoiseError::Cancelled(id.to_string())));
            }
            (id, catalog.apply(id, input, &FilterParameters::default()))
        })
        .collect();

    let mut comparison = ComparisonResult::default();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(raster) => comparison.results.push((id.to_string(), raster)),
            Err(err) if err.is_input_error() => return Err(err),
            Err(err) => {
                log::warn!("filter '{}' skipped in comparison: {}", id, err);
                comparison.diagnostics.push(FilterFailure::new(id, &err));
            }
        }
    }
    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DenoiseConfig;
    use crate::filters::bilateral::BilateralConfig;
    use crate::filters::test_util::gradient;
    use crate::noise::salt_and_pepper;

    #[test]
    fn test_compare_all_order() {
        let catalog = FilterCatalog::default();
        let img = salt_and_pepper(&gradient(24, 20), 0.05, 11).unwrap();
        let result = compare_all(&catalog, &img).unwrap();
        let ids: Vec<_> = result.ids().collect();
        assert_eq!(ids, ["median", "adaptive", "morphological", "wiener", "bilateral"]);
        assert!(result.diagnostics.is_empty());
        for (_, raster) in &result.results {
            assert_eq!(raster.dim(), img.dim());
        }
    }

    #[test]
    fn test_compare_all_matches_individual_apply() {
        let catalog = FilterCatalog::default();
        let img = salt_and_pepper(&gradient(16, 16), 0.1, 2).unwrap();
        let result = compare_all(&catalog, &img).unwrap();
        for descriptor in catalog.list() {
            let single = catalog.apply(descriptor.id, &img, &FilterParameters::default()).unwrap();
            assert_eq!(result.get(descriptor.id), Some(&single), "{}", descriptor.id);
        }
    }

    #[test]
    fn test_compare_all_partial_failure() {
        // sigma_color squared underflows to zero, so every range weight is NaN
        let config = DenoiseConfig {
            bilateral: BilateralConfig {
                diameter: Some(3),
                sigma_color: 1e-200,
                sigma_space: 1.0,
            },
            ..DenoiseConfig::default()
        };
        let catalog = FilterCatalog::new(&config).unwrap();
        let img = RasterBuffer::from_fn(6, 6, 1, |x, y, _| if (x + y) % 2 == 0 { 0 } else { 255 }).unwrap();
        let result = compare_all(&catalog, &img).unwrap();
        let ids: Vec<_> = result.ids().collect();
        assert_eq!(ids, ["median", "adaptive", "morphological", "wiener"]);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].filter_id, "bilateral");
        assert_eq!(result.diagnostics[0].kind, "filter_execution_failure");
    }

    #[test]
    fn test_compare_all_empty_input_aborts() {
        let catalog = FilterCatalog::default();
        let img = RasterBuffer::new(0, 5, 1, vec![]).unwrap();
        assert_eq!(compare_all(&catalog, &img).unwrap_err().kind(), "empty_image");
    }

    #[test]
    fn test_cancelled_before_start() {
        let catalog = FilterCatalog::default();
        let img = gradient(10, 10);
        let token = CancellationToken::new();
        token.cancel();
        let result = compare_all_with_cancel(&catalog, &img, &token).unwrap();
        assert!(result.results.is_empty());
        assert_eq!(result.diagnostics.len(), catalog.len());
        assert!(result.diagnostics.iter().all(|d| d.kind == "cancelled"));
    }
}
