use std::collections::BTreeMap;

use crate::error::{SimvizError, SimvizResult};

/// The single validated construction input, produced by an external backend.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct VisPayload {
    pub x_series: Vec<f64>,
    #[serde(default)]
    pub element_data: BTreeMap<ElementKind, Vec<ElementSpec>>,
    /// Overlay texture id -> opaque markup, inserted once into the document
    /// defs area.
    #[serde(default)]
    pub overlays: BTreeMap<String, String>,
    /// Standalone legends rendered independent of any element.
    #[serde(default)]
    pub color_scales: Vec<LegendSpec>,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Cell,
    Line,
    Heatmap,
    Toggle,
    Report,
    Table,
    Colorscale,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ElementSpec {
    /// Document node ids sharing one visual encoding. Each bound node gets
    /// its own pattern instance. May be empty for report-only kinds.
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub conditions: Vec<Condition>,
    /// Layout anchor for the optional textual report.
    #[serde(default)]
    pub report_id: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LegendSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub palette: Vec<String>,
    pub levels: Vec<f64>,
}

/// Fields shared by every condition kind.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ConditionMeta {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_report")]
    pub report: bool,
    #[serde(default)]
    pub overlay: Option<String>,
    #[serde(default = "default_section_label")]
    pub section_label: String,
}

fn default_opacity() -> f64 {
    1.0
}

fn default_report() -> bool {
    true
}

fn default_section_label() -> String {
    "Section".to_string()
}

impl Default for ConditionMeta {
    fn default() -> Self {
        Self {
            description: String::new(),
            unit: String::new(),
            opacity: default_opacity(),
            report: default_report(),
            overlay: None,
            section_label: default_section_label(),
        }
    }
}

/// Palette + declared levels for scale-bearing condition kinds.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ScaleSpec {
    pub palette: Vec<String>,
    pub levels: Vec<f64>,
}

impl ScaleSpec {
    fn validate(&self, what: &str) -> SimvizResult<()> {
        if self.palette.is_empty() {
            return Err(SimvizError::payload(format!(
                "{what}: palette must be non-empty"
            )));
        }
        if self.levels.is_empty() {
            return Err(SimvizError::payload(format!(
                "{what}: levels must be non-empty"
            )));
        }
        if self.levels.iter().any(|v| !v.is_finite()) {
            return Err(SimvizError::payload(format!("{what}: levels must be finite")));
        }
        Ok(())
    }
}

/// A per-step series that is either scalar or split into sections.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Series {
    Scalar(Vec<f64>),
    PerSection(Vec<Vec<f64>>),
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(v) => v.len(),
            Self::PerSection(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Section count of the first time step (scalar series have one).
    pub fn first_section_count(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::PerSection(v) => v.first().map_or(0, Vec::len),
        }
    }

    fn validate(&self, what: &str, n: usize) -> SimvizResult<()> {
        if self.len() != n {
            return Err(SimvizError::payload(format!(
                "{what}: data length {} does not match x_series length {n}",
                self.len()
            )));
        }
        if let Self::PerSection(rows) = self {
            let width = rows.first().map_or(0, Vec::len);
            if width == 0 {
                return Err(SimvizError::payload(format!(
                    "{what}: sectioned data must have at least one section"
                )));
            }
            if rows.iter().any(|r| r.len() != width) {
                return Err(SimvizError::payload(format!(
                    "{what}: section count must not change across the series"
                )));
            }
        }
        Ok(())
    }
}

/// Borrowed view of the series a condition contributes to a report panel.
pub enum ReportSeries<'a> {
    OneD(&'a [f64]),
    TwoD(&'a [Vec<f64>]),
}

/// Declarative rule binding a time series to a visual encoding.
///
/// The tag vocabulary is canonical: historical payloads used diverging names
/// (`sections_equal` vs `equal_y`); only the names below are accepted.
/// Unrecognized tags parse to [`Condition::Unknown`] and evaluate to nothing.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Background(BackgroundCondition),
    LevelStatic(LevelStaticCondition),
    LevelDynamic(LevelDynamicCondition),
    Logical(LogicalCondition),
    ZonalY(ZonalYCondition),
    EqualY(EqualYCondition),
    Heatmap(HeatmapCondition),
    ShowHide(ShowHideCondition),
    Info(InfoCondition),
    TabularInfo(TabularInfoCondition),
    ColorScale(ColorScaleCondition),
    #[serde(other)]
    Unknown,
}

/// Full-height background whose color tracks `data[x]` through the scale.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BackgroundCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    pub data: Vec<f64>,
    #[serde(flatten)]
    pub scale: ScaleSpec,
}

/// Level indicator with a fixed color.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LevelStaticCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    pub data: Vec<f64>,
    pub color: String,
    pub min_height: f64,
    pub max_height: f64,
}

/// Level indicator colored by a secondary series.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LevelDynamicCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    pub data: Vec<f64>,
    pub data_dynamic: Vec<f64>,
    #[serde(flatten)]
    pub scale: ScaleSpec,
    pub min_height: f64,
    pub max_height: f64,
}

/// Full-height fill alternating between two colors on a truth test.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LogicalCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    pub data: Vec<f64>,
    pub true_color: String,
    pub false_color: String,
}

/// Vertical multi-zone model: one level + one color value per zone.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ZonalYCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    pub data: Vec<Vec<f64>>,
    pub data_dynamic: Vec<Vec<f64>>,
    #[serde(flatten)]
    pub scale: ScaleSpec,
    pub min_height: f64,
    pub max_height: f64,
}

/// Equal vertical sections along an open path, each colored by the scale.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EqualYCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    pub data: Series,
    #[serde(flatten)]
    pub scale: ScaleSpec,
}

/// Rectangular matrix of bins, one color value per bin per step.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HeatmapCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    pub data: Vec<Vec<Vec<f64>>>,
    #[serde(flatten)]
    pub scale: ScaleSpec,
}

/// Show/hide toggle driven by a truth test on `data[x]`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ShowHideCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    pub data: Vec<f64>,
}

/// Report-only data, no visual encoding.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct InfoCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    pub data: Series,
}

/// Tabular report content: per step, a list of rows of text cells.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TabularInfoCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    pub tabular_data: Vec<Vec<Vec<String>>>,
    pub headers: Vec<String>,
}

/// Standalone color scale legend bound to a placement anchor.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ColorScaleCondition {
    #[serde(flatten)]
    pub meta: ConditionMeta,
    #[serde(flatten)]
    pub scale: ScaleSpec,
}

impl Condition {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Background(_) => "background",
            Self::LevelStatic(_) => "level_static",
            Self::LevelDynamic(_) => "level_dynamic",
            Self::Logical(_) => "logical",
            Self::ZonalY(_) => "zonal_y",
            Self::EqualY(_) => "equal_y",
            Self::Heatmap(_) => "heatmap",
            Self::ShowHide(_) => "show_hide",
            Self::Info(_) => "info",
            Self::TabularInfo(_) => "tabular_info",
            Self::ColorScale(_) => "color_scale",
            Self::Unknown => "unknown",
        }
    }

    pub fn meta(&self) -> Option<&ConditionMeta> {
        match self {
            Self::Background(c) => Some(&c.meta),
            Self::LevelStatic(c) => Some(&c.meta),
            Self::LevelDynamic(c) => Some(&c.meta),
            Self::Logical(c) => Some(&c.meta),
            Self::ZonalY(c) => Some(&c.meta),
            Self::EqualY(c) => Some(&c.meta),
            Self::Heatmap(c) => Some(&c.meta),
            Self::ShowHide(c) => Some(&c.meta),
            Self::Info(c) => Some(&c.meta),
            Self::TabularInfo(c) => Some(&c.meta),
            Self::ColorScale(c) => Some(&c.meta),
            Self::Unknown => None,
        }
    }

    pub fn scale_spec(&self) -> Option<&ScaleSpec> {
        match self {
            Self::Background(c) => Some(&c.scale),
            Self::LevelDynamic(c) => Some(&c.scale),
            Self::ZonalY(c) => Some(&c.scale),
            Self::EqualY(c) => Some(&c.scale),
            Self::Heatmap(c) => Some(&c.scale),
            Self::ColorScale(c) => Some(&c.scale),
            Self::LevelStatic(_)
            | Self::Logical(_)
            | Self::ShowHide(_)
            | Self::Info(_)
            | Self::TabularInfo(_)
            | Self::Unknown => None,
        }
    }

    /// Series this condition exposes to a report panel, if any.
    pub fn report_series(&self) -> Option<ReportSeries<'_>> {
        match self {
            Self::Background(c) => Some(ReportSeries::OneD(&c.data)),
            Self::LevelStatic(c) => Some(ReportSeries::OneD(&c.data)),
            Self::LevelDynamic(c) => Some(ReportSeries::OneD(&c.data)),
            Self::Logical(c) => Some(ReportSeries::OneD(&c.data)),
            Self::ShowHide(c) => Some(ReportSeries::OneD(&c.data)),
            Self::ZonalY(c) => Some(ReportSeries::TwoD(&c.data)),
            Self::Info(c) => Some(match &c.data {
                Series::Scalar(v) => ReportSeries::OneD(v),
                Series::PerSection(v) => ReportSeries::TwoD(v),
            }),
            Self::EqualY(c) => Some(match &c.data {
                Series::Scalar(v) => ReportSeries::OneD(v),
                Series::PerSection(v) => ReportSeries::TwoD(v),
            }),
            Self::Heatmap(_) | Self::TabularInfo(_) | Self::ColorScale(_) | Self::Unknown => None,
        }
    }

    pub fn validate(&self, n: usize) -> SimvizResult<()> {
        match self {
            Self::Background(c) => {
                check_series_len("background.data", c.data.len(), n)?;
                c.scale.validate("background")
            }
            Self::LevelStatic(c) => check_series_len("level_static.data", c.data.len(), n),
            Self::LevelDynamic(c) => {
                check_series_len("level_dynamic.data", c.data.len(), n)?;
                check_series_len("level_dynamic.data_dynamic", c.data_dynamic.len(), n)?;
                c.scale.validate("level_dynamic")
            }
            Self::Logical(c) => check_series_len("logical.data", c.data.len(), n),
            Self::ZonalY(c) => {
                check_series_len("zonal_y.data", c.data.len(), n)?;
                check_series_len("zonal_y.data_dynamic", c.data_dynamic.len(), n)?;
                let zones = c.data.first().map_or(0, Vec::len);
                if zones == 0 {
                    return Err(SimvizError::payload("zonal_y: must have at least one zone"));
                }
                let uniform = c.data.iter().all(|r| r.len() == zones)
                    && c.data_dynamic.iter().all(|r| r.len() == zones);
                if !uniform {
                    return Err(SimvizError::payload(
                        "zonal_y: zone count must not change across the series",
                    ));
                }
                c.scale.validate("zonal_y")
            }
            Self::EqualY(c) => {
                c.data.validate("equal_y.data", n)?;
                c.scale.validate("equal_y")
            }
            Self::Heatmap(c) => {
                check_series_len("heatmap.data", c.data.len(), n)?;
                let rows = c.data.first().map_or(0, Vec::len);
                let cols = c.data.first().and_then(|s| s.first()).map_or(0, Vec::len);
                if rows == 0 || cols == 0 {
                    return Err(SimvizError::payload(
                        "heatmap: first time step must be a non-empty matrix",
                    ));
                }
                let rectangular = c
                    .data
                    .iter()
                    .all(|s| s.len() == rows && s.iter().all(|r| r.len() == cols));
                if !rectangular {
                    return Err(SimvizError::payload(
                        "heatmap: matrix shape must not change across the series",
                    ));
                }
                c.scale.validate("heatmap")
            }
            Self::ShowHide(c) => check_series_len("show_hide.data", c.data.len(), n),
            Self::Info(c) => c.data.validate("info.data", n),
            Self::TabularInfo(c) => {
                check_series_len("tabular_info.tabular_data", c.tabular_data.len(), n)?;
                if c.headers.is_empty() {
                    return Err(SimvizError::payload(
                        "tabular_info: headers must be non-empty",
                    ));
                }
                Ok(())
            }
            Self::ColorScale(c) => c.scale.validate("color_scale"),
            Self::Unknown => Ok(()),
        }
    }
}

fn check_series_len(what: &str, len: usize, n: usize) -> SimvizResult<()> {
    if len != n {
        return Err(SimvizError::payload(format!(
            "{what}: data length {len} does not match x_series length {n}"
        )));
    }
    Ok(())
}

impl VisPayload {
    pub fn validate(&self) -> SimvizResult<()> {
        if self.x_series.is_empty() {
            return Err(SimvizError::payload("x_series must be non-empty"));
        }
        if self.x_series.iter().any(|v| !v.is_finite()) {
            return Err(SimvizError::payload("x_series values must be finite"));
        }
        let n = self.x_series.len();

        for (kind, specs) in &self.element_data {
            for spec in specs {
                spec.validate(*kind, n)?;
            }
        }

        for legend in &self.color_scales {
            if legend.id.trim().is_empty() {
                return Err(SimvizError::payload("color_scales entries must have an id"));
            }
            ScaleSpec {
                palette: legend.palette.clone(),
                levels: legend.levels.clone(),
            }
            .validate("color_scales")?;
        }

        Ok(())
    }
}

impl ElementSpec {
    fn validate(&self, kind: ElementKind, n: usize) -> SimvizResult<()> {
        let what = || format!("{kind:?} element '{}'", self.ids.join(","));

        match kind {
            ElementKind::Cell | ElementKind::Line | ElementKind::Heatmap | ElementKind::Toggle => {
                if self.ids.is_empty() || self.ids.iter().any(|id| id.trim().is_empty()) {
                    return Err(SimvizError::payload(format!(
                        "{}: ids must be non-empty",
                        what()
                    )));
                }
            }
            ElementKind::Report | ElementKind::Table | ElementKind::Colorscale => {
                if self
                    .report_id
                    .as_deref()
                    .is_none_or(|id| id.trim().is_empty())
                {
                    return Err(SimvizError::payload(format!(
                        "{}: report_id is required for report-only kinds",
                        what()
                    )));
                }
            }
        }

        if self.conditions.is_empty() {
            return Err(SimvizError::payload(format!(
                "{}: conditions must be non-empty",
                what()
            )));
        }

        let first = &self.conditions[0];
        match kind {
            ElementKind::Heatmap => {
                if !matches!(first, Condition::Heatmap(_)) {
                    return Err(SimvizError::payload(format!(
                        "{}: first condition must be of type heatmap",
                        what()
                    )));
                }
            }
            ElementKind::Toggle => {
                if !matches!(first, Condition::ShowHide(_) | Condition::Logical(_)) {
                    return Err(SimvizError::payload(format!(
                        "{}: first condition must be show_hide or logical",
                        what()
                    )));
                }
            }
            ElementKind::Table => {
                if !matches!(first, Condition::TabularInfo(_)) {
                    return Err(SimvizError::payload(format!(
                        "{}: first condition must be tabular_info",
                        what()
                    )));
                }
            }
            ElementKind::Colorscale => {
                if !matches!(first, Condition::ColorScale(_)) {
                    return Err(SimvizError::payload(format!(
                        "{}: first condition must be color_scale",
                        what()
                    )));
                }
            }
            ElementKind::Cell | ElementKind::Line | ElementKind::Report => {}
        }

        for condition in &self.conditions {
            condition
                .validate(n)
                .map_err(|err| SimvizError::payload(format!("{}: {err}", what())))?;
        }

        Ok(())
    }
}
