use std::{cmp::Ordering, collections::BTreeMap};

use crate::{
    condition::PropertyTuple,
    document::{Document, Paint},
    error::{SimvizError, SimvizResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PaintTarget {
    Fill,
    Stroke,
}

/// Two realizations of the same abstraction: discrete stacked bands compose
/// with texture overlays; paired hard gradient stops are cheaper when no
/// overlay is needed. Both obey the descending-order stacking rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternEncoding {
    #[default]
    Banded,
    Gradient,
}

/// Thickness of the band transition seam, in document units.
pub const SEAM_THICKNESS: f64 = 1.0;

#[derive(Clone, Debug, serde::Serialize)]
pub struct Band {
    /// Normalized order this band was last applied with.
    pub order: f64,
    /// Top edge in document units from the pattern top.
    pub y: f64,
    pub fill: String,
    pub opacity: f64,
    /// `None` parks the seam off-canvas (full-height bands draw no seam).
    pub seam_y: Option<f64>,
    pub overlay: Option<OverlayBand>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct OverlayBand {
    pub overlay_id: String,
    pub y: f64,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct GradientStop {
    /// Percentage offset from the gradient start.
    pub offset: f64,
    pub color: String,
    pub opacity: f64,
}

#[derive(Clone, Debug, serde::Serialize)]
pub enum PatternState {
    Banded { height: f64, bands: Vec<Band> },
    Gradient { stops: Vec<GradientStop> },
}

/// Owns one reusable paint primitive per bound node. Primitives are created
/// once by [`ensure`](PatternCompiler::ensure) and mutated in place by every
/// subsequent [`apply`](PatternCompiler::apply); sub-node counts only grow.
#[derive(Clone, Debug, serde::Serialize)]
pub struct PatternCompiler {
    encoding: PatternEncoding,
    patterns: BTreeMap<String, PatternState>,
}

impl PatternCompiler {
    pub fn new(encoding: PatternEncoding) -> Self {
        Self {
            encoding,
            patterns: BTreeMap::new(),
        }
    }

    pub fn pattern_id(node_id: &str) -> String {
        format!("pattern_{node_id}")
    }

    pub fn encoding(&self) -> PatternEncoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn state(&self, pattern_id: &str) -> Option<&PatternState> {
        self.patterns.get(pattern_id)
    }

    /// Idempotent: creates the backing primitive sized to the node and points
    /// the node's paint at it only if it does not already exist.
    pub fn ensure(
        &mut self,
        doc: &mut Document,
        node_id: &str,
        pattern_id: &str,
        target: PaintTarget,
    ) -> SimvizResult<()> {
        if self.patterns.contains_key(pattern_id) {
            return Ok(());
        }

        let node = doc
            .node_mut(node_id)
            .ok_or_else(|| SimvizError::document(format!("node '{node_id}' not found")))?;

        let state = match self.encoding {
            PatternEncoding::Banded => PatternState::Banded {
                height: node.bbox.height(),
                bands: Vec::new(),
            },
            PatternEncoding::Gradient => PatternState::Gradient { stops: Vec::new() },
        };

        let paint = Paint::Reference(pattern_id.to_string());
        match target {
            PaintTarget::Fill => node.fill = paint,
            PaintTarget::Stroke => node.stroke = paint,
        }
        node.fill_opacity = 1.0;
        node.opacity = 1.0;

        self.patterns.insert(pattern_id.to_string(), state);
        Ok(())
    }

    /// Rewrites the primitive from the evaluated tuples. Tuples are stacked
    /// by descending order; ties keep their original condition order, which
    /// fixes paint order.
    pub fn apply(
        &mut self,
        pattern_id: &str,
        tuples: &[PropertyTuple],
        doc: &Document,
    ) -> SimvizResult<()> {
        let state = self.patterns.get_mut(pattern_id).ok_or_else(|| {
            SimvizError::document(format!("pattern '{pattern_id}' has not been built"))
        })?;

        let mut sorted: Vec<&PropertyTuple> = tuples.iter().collect();
        sorted.sort_by(|a, b| b.order.partial_cmp(&a.order).unwrap_or(Ordering::Equal));

        match state {
            PatternState::Banded { height, bands } => {
                for (i, tuple) in sorted.iter().enumerate() {
                    let y = (1.0 - tuple.order).max(0.0) * *height;
                    let band = Band {
                        order: tuple.order,
                        y,
                        fill: tuple.color.clone(),
                        opacity: tuple.opacity,
                        seam_y: (tuple.order < 1.0).then_some(y),
                        overlay: tuple
                            .overlay
                            .as_deref()
                            .filter(|id| doc.has_overlay(id))
                            .map(|id| OverlayBand {
                                overlay_id: id.to_string(),
                                y,
                            }),
                    };
                    if i < bands.len() {
                        bands[i] = band;
                    } else {
                        bands.push(band);
                    }
                }
            }
            PatternState::Gradient { stops } => {
                let next = gradient_stops(&sorted);
                if stops.is_empty() {
                    *stops = next;
                } else if stops.len() == next.len() {
                    for (slot, stop) in stops.iter_mut().zip(next) {
                        *slot = stop;
                    }
                } else {
                    return Err(SimvizError::evaluation(format!(
                        "pattern '{pattern_id}': stop count changed from {} to {}",
                        stops.len(),
                        next.len()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Converts descending-order tuples into paired hard stops: at each interior
/// boundary the previous band's color ends and the next begins at the same
/// offset, reproducing discrete banding with a gradient.
fn gradient_stops(sorted_desc: &[&PropertyTuple]) -> Vec<GradientStop> {
    let mut stops = Vec::with_capacity(sorted_desc.len() * 2);
    for (i, tuple) in sorted_desc.iter().enumerate() {
        let offset = (1.0 - tuple.order.min(1.0)).max(0.0) * 100.0;
        if i > 0 {
            let prev = sorted_desc[i - 1];
            stops.push(GradientStop {
                offset,
                color: prev.color.clone(),
                opacity: prev.opacity,
            });
        }
        stops.push(GradientStop {
            offset,
            color: tuple.color.clone(),
            opacity: tuple.opacity,
        });
    }
    if let Some(last) = sorted_desc.last() {
        stops.push(GradientStop {
            offset: 100.0,
            color: last.color.clone(),
            opacity: last.opacity,
        });
    }
    stops
}
