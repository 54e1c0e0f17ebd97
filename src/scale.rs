use crate::{
    error::{SimvizError, SimvizResult},
    model::ScaleSpec,
};

/// Quantile bucket mapping from a numeric domain onto a discrete palette.
///
/// The domain is the `[min, max]` envelope of the declared levels and is cut
/// into `palette.len()` evenly spaced buckets. Lookups saturate at both ends
/// rather than erroring, so out-of-range simulation values stay renderable.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ColorScale {
    domain: (f64, f64),
    thresholds: Vec<f64>, // ascending, len = palette.len() - 1
    palette: Vec<String>,
}

impl ColorScale {
    pub fn from_spec(spec: &ScaleSpec) -> SimvizResult<Self> {
        if spec.palette.is_empty() {
            return Err(SimvizError::payload("color scale palette must be non-empty"));
        }
        if spec.levels.is_empty() {
            return Err(SimvizError::payload("color scale levels must be non-empty"));
        }

        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in &spec.levels {
            if !v.is_finite() {
                return Err(SimvizError::payload("color scale levels must be finite"));
            }
            lo = lo.min(v);
            hi = hi.max(v);
        }

        let k = spec.palette.len();
        let thresholds = (1..k)
            .map(|i| lo + (hi - lo) * (i as f64) / (k as f64))
            .collect();

        Ok(Self {
            domain: (lo, hi),
            thresholds,
            palette: spec.palette.clone(),
        })
    }

    pub fn color(&self, v: f64) -> &str {
        let idx = self.thresholds.partition_point(|t| *t <= v);
        &self.palette[idx]
    }

    pub fn bucket_count(&self) -> usize {
        self.palette.len()
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// `[lower, upper)` value bounds of bucket `i`; the first and last bucket
    /// are closed at the domain edges.
    pub fn bucket_extent(&self, i: usize) -> (f64, f64) {
        let lo = if i == 0 {
            self.domain.0
        } else {
            self.thresholds[i - 1]
        };
        let hi = if i + 1 >= self.palette.len() {
            self.domain.1
        } else {
            self.thresholds[i]
        };
        (lo, hi)
    }
}
