//! Standard pipe sizes.

use dh_core::units::{Length, m};

use crate::error::{HydraulicsError, HydraulicsResult};

/// One catalog entry: nominal size and internal diameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeSize {
    pub dn: u32,
    pub inner_diameter: Length,
}

impl PipeSize {
    pub fn new(dn: u32, inner_diameter_m: f64) -> Self {
        Self {
            dn,
            inner_diameter: m(inner_diameter_m),
        }
    }
}

/// Pipe sizes ordered by ascending internal diameter.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeCatalog {
    sizes: Vec<PipeSize>,
}

/// Steel service pipes DN20 to DN300.
const STANDARD_SIZES: [(u32, f64); 13] = [
    (20, 0.0217),
    (25, 0.0285),
    (32, 0.0372),
    (40, 0.0431),
    (50, 0.0545),
    (65, 0.0703),
    (80, 0.0825),
    (100, 0.1071),
    (125, 0.1325),
    (150, 0.1603),
    (200, 0.2101),
    (250, 0.263),
    (300, 0.3127),
];

impl PipeCatalog {
    /// Build a catalog; fails on an empty list, a non-positive diameter or
    /// a repeated nominal size.
    pub fn new(mut sizes: Vec<PipeSize>) -> HydraulicsResult<Self> {
        if sizes.is_empty() {
            return Err(HydraulicsError::EmptyCatalog);
        }
        for size in &sizes {
            let d = size.inner_diameter.value;
            if !d.is_finite() || d <= 0.0 {
                return Err(HydraulicsError::config(format!(
                    "DN{} has non-positive diameter {d}",
                    size.dn
                )));
            }
        }
        sizes.sort_by(|a, b| {
            a.inner_diameter
                .value
                .total_cmp(&b.inner_diameter.value)
                .then(a.dn.cmp(&b.dn))
        });
        let mut seen: Vec<u32> = sizes.iter().map(|s| s.dn).collect();
        seen.sort_unstable();
        if let Some(w) = seen.windows(2).find(|w| w[0] == w[1]) {
            return Err(HydraulicsError::config(format!("DN{} listed twice", w[0])));
        }
        Ok(Self { sizes })
    }

    pub fn standard() -> Self {
        Self {
            sizes: STANDARD_SIZES
                .iter()
                .map(|&(dn, d)| PipeSize::new(dn, d))
                .collect(),
        }
    }

    pub fn sizes(&self) -> &[PipeSize] {
        &self.sizes
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl Default for PipeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
