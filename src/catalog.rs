//! Filter registry.
//!
//! The catalog is built once from a [`DenoiseConfig`] and shared by
//! reference. Every filter is a variant of the closed [`FilterKind`] set; the
//! catalog maps ids to variants and validates parameters against each
//! variant's [`FilterDescriptor`] before dispatch.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::DenoiseConfig;
use crate::error::{DenoiseError, Result};
use crate::filters::adaptive_median::adaptive_median;
use crate::filters::bilateral::{bilateral, BilateralConfig};
use crate::filters::median::median;
use crate::filters::morphology::morphological;
use crate::filters::wiener::{wiener, WienerConfig};
use crate::filters::{KernelOptions, KernelSizeRange, KERNEL_SIZE_RANGE};
use crate::raster::RasterBuffer;

/// The closed set of denoising filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Median,
    AdaptiveMedian,
    Morphological,
    Wiener,
    Bilateral,
}

impl FilterKind {
    /// Registration order.
    pub const ALL: [FilterKind; 5] = [
        FilterKind::Median,
        FilterKind::AdaptiveMedian,
        FilterKind::Morphological,
        FilterKind::Wiener,
        FilterKind::Bilateral,
    ];

    pub fn id(self) -> &'static str {
        match self {
            FilterKind::Median => "median",
            FilterKind::AdaptiveMedian => "adaptive",
            FilterKind::Morphological => "morphological",
            FilterKind::Wiener => "wiener",
            FilterKind::Bilateral => "bilateral",
        }
    }

    fn descriptor(self, default_kernel_size: usize) -> FilterDescriptor {
        let (display_name, description, parameter_names): (_, _, &'static [&'static str]) = match self {
            FilterKind::Median => ("Median", "Standard Median Filter", &["kernel_size"]),
            FilterKind::AdaptiveMedian => ("Adaptive Median", "Adaptive Median Filter", &["window_size"]),
            FilterKind::Morphological => (
                "Morphological",
                "Morphological Opening + Closing",
                &["kernel_size"],
            ),
            FilterKind::Wiener => ("Wiener", "Wiener Filter", &["window_size"]),
            FilterKind::Bilateral => ("Bilateral", "Bilateral Filter (Edge-Preserving)", &[]),
        };
        let accepts_kernel_size = self != FilterKind::Bilateral;
        FilterDescriptor {
            id: self.id(),
            display_name,
            description,
            accepts_kernel_size,
            kernel_size_range: KERNEL_SIZE_RANGE,
            default_kernel_size: accepts_kernel_size.then_some(default_kernel_size),
            parameter_names,
        }
    }
}

/// Static metadata for one registered filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub accepts_kernel_size: bool,
    pub kernel_size_range: KernelSizeRange,
    pub default_kernel_size: Option<usize>,
    /// Parameter names advertised to clients.
    pub parameter_names: &'static [&'static str],
}

impl FilterDescriptor {
    /// Resolve the kernel size to use for an invocation.
    ///
    /// Filters without a kernel parameter ignore whatever the caller passed.
    pub fn resolve(&self, params: &FilterParameters) -> Result<Option<usize>> {
        if !self.accepts_kernel_size {
            return Ok(None);
        }
        match params.kernel_size.or(self.default_kernel_size) {
            Some(k) => self.kernel_size_range.validate(k).map(Some),
            None => Err(DenoiseError::InvalidParameter(format!(
                "filter '{}' requires a kernel size",
                self.id
            ))),
        }
    }
}

/// Per-invocation parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterParameters {
    pub kernel_size: Option<usize>,
}

impl FilterParameters {
    pub fn with_kernel_size(kernel_size: usize) -> Self {
        Self {
            kernel_size: Some(kernel_size),
        }
    }
}

/// Settings shared by every dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FilterSettings {
    kernel: KernelOptions,
    wiener: WienerConfig,
    bilateral: BilateralConfig,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    kind: FilterKind,
    descriptor: FilterDescriptor,
}

/// Registry mapping filter ids to descriptors and implementations.
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<&'static str, usize>,
    settings: FilterSettings,
}

impl FilterCatalog {
    /// Build the catalog from a validated configuration.
    pub fn new(config: &DenoiseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &DenoiseConfig) -> Self {
        let mut catalog = Self {
            entries: Vec::with_capacity(FilterKind::ALL.len()),
            index: HashMap::new(),
            settings: FilterSettings {
                kernel: config.kernel,
                wiener: config.wiener,
                bilateral: config.bilateral,
            },
        };
        for kind in FilterKind::ALL {
            catalog.register(kind, config.default_kernel_size);
        }
        catalog
    }

    fn register(&mut self, kind: FilterKind, default_kernel_size: usize) {
        let descriptor = kind.descriptor(default_kernel_size);
        self.index.insert(descriptor.id, self.entries.len());
        self.entries.push(CatalogEntry { kind, descriptor });
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> impl ExactSizeIterator<Item = &FilterDescriptor> + '_ {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FilterDescriptor> {
        self.index.get(id).map(|&i| &self.entries[i].descriptor)
    }

    fn entry(&self, id: &str) -> Result<&CatalogEntry> {
        self.index
            .get(id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| DenoiseError::UnknownFilter(id.to_string()))
    }

    /// Run filter `id` over `input`.
    ///
    /// # Errors
    /// `UnknownFilter`, `InvalidParameter`, `EmptyImage`, or whatever the
    /// kernel itself reports.
    pub fn apply(&self, id: &str, input: &RasterBuffer, params: &FilterParameters) -> Result<RasterBuffer> {
        let entry = self.entry(id)?;
        let kernel_size = entry.descriptor.resolve(params)?;
        input.ensure_not_empty()?;

        log::debug!(
            "applying '{}' to {}x{}x{} (kernel_size={:?})",
            id,
            input.width(),
            input.height(),
            input.channels(),
            kernel_size
        );
        self.dispatch(entry.kind, input, kernel_size)
    }

    fn dispatch(&self, kind: FilterKind, input: &RasterBuffer, kernel_size: Option<usize>) -> Result<RasterBuffer> {
        let s = &self.settings;
        // resolve() guarantees a size for every kind that takes one
        let k = kernel_size.unwrap_or(KERNEL_SIZE_RANGE.min);
        match kind {
            FilterKind::Median => median(input, k, s.kernel),
            FilterKind::AdaptiveMedian => adaptive_median(input, k, s.kernel),
            FilterKind::Morphological => morphological(input, k, s.kernel),
            FilterKind::Wiener => wiener(input, k, &s.wiener, s.kernel),
            FilterKind::Bilateral => bilateral(input, &s.bilateral, s.kernel),
        }
    }
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::build(&DenoiseConfig::default())
    }
}
