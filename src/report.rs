use kurbo::Point;

use crate::{
    condition::CompiledCondition,
    core::{XIndex, format_value},
    document::Document,
    error::{SimvizError, SimvizResult},
    model::ReportSeries,
    scale::ColorScale,
};

// Layout constants in em units; exact typography is delegated to the host.
const HEADER_EM: f64 = 1.2;
const ROW_EM: f64 = 1.0;
const MARGIN_EM: f64 = 0.1;

/// Textual side panel for one element, anchored at a hidden placement node.
/// Built lazily on first use; updates rewrite only the value cells.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ReportLayout {
    pub anchor_id: String,
    pub origin: Point,
    pub width: f64,
    pub title: String,
    pub sections: Vec<ReportSection>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ReportSection {
    pub description: String,
    pub unit: String,
    pub rows: Vec<ReportRow>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ReportRow {
    /// Present only in multi-entry sections ("Zone #1" style).
    pub label: Option<String>,
    /// Em offset of the row from the panel top.
    pub y: f64,
    /// Pre-formatted values, one per time index.
    values: Vec<String>,
    /// The value cell's current text.
    pub current: String,
}

impl ReportRow {
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl ReportLayout {
    /// Resolves and hides the anchor node, then lays out one row per
    /// reporting series entry. All values are formatted up front; updating
    /// is a text swap.
    pub fn build(
        doc: &mut Document,
        anchor_id: &str,
        title: &str,
        conditions: &[CompiledCondition],
    ) -> SimvizResult<Self> {
        let node = doc
            .node(anchor_id)
            .ok_or_else(|| SimvizError::document(format!("report anchor '{anchor_id}' not found")))?;
        let bbox = node.bbox;
        doc.hide(anchor_id)?;

        let row_h = ROW_EM * (1.0 + 2.0 * MARGIN_EM);
        let mut y = HEADER_EM * (1.0 + 2.0 * MARGIN_EM);

        let mut sections = Vec::new();
        for compiled in conditions {
            let condition = compiled.condition();
            let Some(meta) = condition.meta() else {
                continue;
            };
            if !meta.report {
                continue;
            }
            let Some(series) = condition.report_series() else {
                continue;
            };

            let entries = match &series {
                ReportSeries::OneD(_) => 1,
                ReportSeries::TwoD(rows) => rows.first().map_or(0, Vec::len),
            };
            if entries == 0 {
                continue;
            }

            // Description row, then one row per second-axis entry.
            y += row_h;
            let mut rows = Vec::with_capacity(entries);
            for j in 0..entries {
                let values = match &series {
                    ReportSeries::OneD(v) => v.iter().map(|&d| format_value(d)).collect::<Vec<_>>(),
                    ReportSeries::TwoD(v) => v
                        .iter()
                        .map(|row| format_value(row.get(j).copied().unwrap_or(f64::NAN)))
                        .collect(),
                };
                let current = values.first().cloned().unwrap_or_default();
                rows.push(ReportRow {
                    label: (entries > 1).then(|| format!("{} #{}", meta.section_label, j + 1)),
                    y,
                    values,
                    current,
                });
                y += row_h;
            }

            sections.push(ReportSection {
                description: meta.description.clone(),
                unit: meta.unit.clone(),
                rows,
            });
        }

        Ok(Self {
            anchor_id: anchor_id.to_string(),
            origin: Point::new(bbox.x0, bbox.y0),
            width: bbox.width(),
            title: title.to_string(),
            sections,
        })
    }

    pub fn update(&mut self, x: XIndex) {
        for section in &mut self.sections {
            for row in &mut section.rows {
                if let Some(value) = row.values.get(x.0) {
                    row.current = value.clone();
                }
            }
        }
    }
}

/// Tabular report: a fixed header plus per-step content rows.
#[derive(Clone, Debug, serde::Serialize)]
pub struct TableLayout {
    pub anchor_id: String,
    pub origin: Point,
    pub width: f64,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableLayout {
    pub fn build(doc: &mut Document, anchor_id: &str, headers: &[String]) -> SimvizResult<Self> {
        let node = doc
            .node(anchor_id)
            .ok_or_else(|| SimvizError::document(format!("table anchor '{anchor_id}' not found")))?;
        let bbox = node.bbox;
        doc.hide(anchor_id)?;

        Ok(Self {
            anchor_id: anchor_id.to_string(),
            origin: Point::new(bbox.x0, bbox.y0),
            width: bbox.width(),
            headers: headers.to_vec(),
            rows: Vec::new(),
        })
    }

    /// Explicit reconciliation: match the row count to `data[x]`, then
    /// rewrite every cell's text.
    pub fn update(&mut self, x: XIndex, data: &[Vec<Vec<String>>]) {
        let Some(target) = data.get(x.0) else {
            return;
        };

        while self.rows.len() > target.len() {
            self.rows.pop();
        }
        while self.rows.len() < target.len() {
            self.rows.push(Vec::new());
        }

        for (row, src) in self.rows.iter_mut().zip(target) {
            row.clear();
            row.extend(src.iter().cloned());
        }
    }
}

/// Static color scale legend: one swatch per palette bucket, labelled with
/// the bucket's lower bound. Rendered once; independent of the time index.
#[derive(Clone, Debug, serde::Serialize)]
pub struct LegendLayout {
    pub anchor_id: String,
    pub origin: Point,
    pub width: f64,
    pub title: String,
    pub swatches: Vec<LegendSwatch>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct LegendSwatch {
    pub x: f64,
    pub width: f64,
    pub color: String,
    pub label: String,
    pub opacity: f64,
}

impl LegendLayout {
    pub fn build(
        doc: &mut Document,
        anchor_id: &str,
        title: &str,
        scale: &ColorScale,
        opacity: f64,
    ) -> SimvizResult<Self> {
        let node = doc
            .node(anchor_id)
            .ok_or_else(|| SimvizError::document(format!("legend anchor '{anchor_id}' not found")))?;
        let bbox = node.bbox;
        doc.hide(anchor_id)?;

        let width = bbox.width();
        let step = width / scale.bucket_count() as f64;
        let swatches = scale
            .palette()
            .iter()
            .enumerate()
            .map(|(i, color)| LegendSwatch {
                x: i as f64 * step,
                width: step,
                color: color.clone(),
                label: format!("{:.0}", scale.bucket_extent(i).0),
                opacity,
            })
            .collect();

        Ok(Self {
            anchor_id: anchor_id.to_string(),
            origin: Point::new(bbox.x0, bbox.y0),
            width,
            title: title.to_string(),
            swatches,
        })
    }
}
