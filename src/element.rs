use kurbo::Point;

use crate::{
    condition::{CompiledCondition, Evaluation},
    core::XIndex,
    document::Document,
    error::{SimvizError, SimvizResult},
    model::{Condition, ElementKind, ElementSpec, LegendSpec, ScaleSpec},
    pattern::{PaintTarget, PatternCompiler, PatternEncoding},
    report::{LegendLayout, ReportLayout, TableLayout},
    scale::ColorScale,
};

/// One-way lifecycle for geometry-dependent precomputation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
}

/// One logical simulation indicator, possibly spanning several document
/// nodes, with a description and an optional report.
#[derive(Debug, serde::Serialize)]
pub enum Element {
    Cell(PatternElement),
    Line(PatternElement),
    Heatmap(HeatmapElement),
    Toggle(ToggleElement),
    Report(ReportElement),
    Table(TableElement),
    Legend(LegendElement),
}

impl Element {
    /// Builds an element from its payload spec. Every referenced node must
    /// already exist in the document; a dangling reference is a document
    /// error the caller downgrades to a skip.
    pub fn from_spec(
        kind: ElementKind,
        spec: &ElementSpec,
        doc: &Document,
        encoding: PatternEncoding,
    ) -> SimvizResult<Self> {
        for id in &spec.ids {
            if !doc.contains_node(id) {
                return Err(SimvizError::document(format!(
                    "element node '{id}' not found in document"
                )));
            }
        }

        let report = match &spec.report_id {
            Some(report_id) if doc.contains_node(report_id) => {
                Some(ElementReport::new(report_id.clone()))
            }
            Some(report_id) => {
                tracing::warn!(%report_id, "report anchor not found; skipping report");
                None
            }
            None => None,
        };

        let conditions = spec
            .conditions
            .iter()
            .cloned()
            .map(CompiledCondition::compile)
            .collect::<SimvizResult<Vec<_>>>()?;

        match kind {
            ElementKind::Cell => Ok(Self::Cell(PatternElement::new(
                spec,
                conditions,
                report,
                PaintTarget::Fill,
                encoding,
            ))),
            ElementKind::Line => Ok(Self::Line(PatternElement::new(
                spec,
                conditions,
                report,
                PaintTarget::Stroke,
                encoding,
            ))),
            ElementKind::Heatmap => Ok(Self::Heatmap(HeatmapElement::new(
                spec, conditions, report,
            )?)),
            ElementKind::Toggle => Ok(Self::Toggle(ToggleElement::new(spec, conditions, report)?)),
            ElementKind::Report => {
                let report = report.ok_or_else(|| {
                    SimvizError::document("report element requires a resolvable report_id")
                })?;
                Ok(Self::Report(ReportElement {
                    description: spec.description.clone(),
                    conditions,
                    report,
                }))
            }
            ElementKind::Table => {
                require_anchor(spec, doc)?;
                Ok(Self::Table(TableElement::new(spec, conditions)?))
            }
            ElementKind::Colorscale => {
                require_anchor(spec, doc)?;
                Ok(Self::Legend(LegendElement::from_spec(spec, conditions)?))
            }
        }
    }

    /// Builds a standalone legend from a payload `color_scales` entry.
    pub fn standalone_legend(legend: &LegendSpec, doc: &Document) -> SimvizResult<Self> {
        if !doc.contains_node(&legend.id) {
            return Err(SimvizError::document(format!(
                "legend anchor '{}' not found in document",
                legend.id
            )));
        }
        let scale = ColorScale::from_spec(&ScaleSpec {
            palette: legend.palette.clone(),
            levels: legend.levels.clone(),
        })?;
        Ok(Self::Legend(LegendElement {
            anchor_id: legend.id.clone(),
            description: legend.description.clone(),
            scale,
            opacity: 1.0,
            layout: None,
        }))
    }

    pub fn update(&mut self, x: XIndex, doc: &mut Document) -> SimvizResult<()> {
        match self {
            Self::Cell(el) | Self::Line(el) => el.update(x, doc),
            Self::Heatmap(el) => el.update(x, doc),
            Self::Toggle(el) => el.update(x, doc),
            Self::Report(el) => el.update(x, doc),
            Self::Table(el) => el.update(x, doc),
            Self::Legend(el) => el.update(doc),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Cell(_) => "cell",
            Self::Line(_) => "line",
            Self::Heatmap(_) => "heatmap",
            Self::Toggle(_) => "toggle",
            Self::Report(_) => "report",
            Self::Table(_) => "table",
            Self::Legend(_) => "colorscale",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Cell(el) | Self::Line(el) => &el.description,
            Self::Heatmap(el) => &el.description,
            Self::Toggle(el) => &el.description,
            Self::Report(el) => &el.description,
            Self::Table(el) => &el.description,
            Self::Legend(el) => &el.description,
        }
    }

    pub fn report_layout(&self) -> Option<&ReportLayout> {
        let report = match self {
            Self::Cell(el) | Self::Line(el) => el.report.as_ref(),
            Self::Heatmap(el) => el.report.as_ref(),
            Self::Toggle(el) => el.report.as_ref(),
            Self::Report(el) => Some(&el.report),
            Self::Table(_) | Self::Legend(_) => None,
        };
        report.and_then(|r| r.layout.as_ref())
    }
}

fn require_anchor(spec: &ElementSpec, doc: &Document) -> SimvizResult<()> {
    match spec.report_id.as_deref() {
        Some(id) if doc.contains_node(id) => Ok(()),
        Some(id) => Err(SimvizError::document(format!(
            "anchor node '{id}' not found in document"
        ))),
        None => Err(SimvizError::document("a report_id anchor is required")),
    }
}

/// Lazily built report handle shared by the element variants.
#[derive(Debug, serde::Serialize)]
struct ElementReport {
    anchor_id: String,
    layout: Option<ReportLayout>,
}

impl ElementReport {
    fn new(anchor_id: String) -> Self {
        Self {
            anchor_id,
            layout: None,
        }
    }

    fn update(
        &mut self,
        x: XIndex,
        doc: &mut Document,
        title: &str,
        conditions: &[CompiledCondition],
    ) -> SimvizResult<()> {
        if self.layout.is_none() {
            self.layout = Some(ReportLayout::build(doc, &self.anchor_id, title, conditions)?);
        }
        if let Some(layout) = &mut self.layout {
            layout.update(x);
        }
        Ok(())
    }
}

/// Closed (Cell) and open (Line) path elements: evaluated condition tuples
/// drive one pattern primitive per bound node.
#[derive(Debug, serde::Serialize)]
pub struct PatternElement {
    ids: Vec<String>,
    description: String,
    conditions: Vec<CompiledCondition>,
    target: PaintTarget,
    compiler: PatternCompiler,
    report: Option<ElementReport>,
    lifecycle: Lifecycle,
}

impl PatternElement {
    fn new(
        spec: &ElementSpec,
        conditions: Vec<CompiledCondition>,
        report: Option<ElementReport>,
        target: PaintTarget,
        encoding: PatternEncoding,
    ) -> Self {
        Self {
            ids: spec.ids.clone(),
            description: spec.description.clone(),
            conditions,
            target,
            compiler: PatternCompiler::new(encoding),
            report,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    fn update(&mut self, x: XIndex, doc: &mut Document) -> SimvizResult<()> {
        if self.lifecycle == Lifecycle::Uninitialized {
            for id in &self.ids {
                self.compiler
                    .ensure(doc, id, &PatternCompiler::pattern_id(id), self.target)?;
            }
            self.lifecycle = Lifecycle::Ready;
        }

        let mut tuples = Vec::new();
        for condition in &self.conditions {
            match condition.evaluate(x)? {
                Evaluation::Tuples(t) => tuples.extend(t),
                Evaluation::Visibility(_) | Evaluation::Skip => {}
            }
        }

        for id in &self.ids {
            self.compiler
                .apply(&PatternCompiler::pattern_id(id), &tuples, doc)?;
        }

        if let Some(report) = &mut self.report {
            report.update(x, doc, &self.description, &self.conditions)?;
        }
        Ok(())
    }

    pub fn compiler(&self) -> &PatternCompiler {
        &self.compiler
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

/// Fixed-shape grid of color bins over each bound node's bounding box.
#[derive(Debug, serde::Serialize)]
pub struct HeatmapElement {
    ids: Vec<String>,
    description: String,
    conditions: Vec<CompiledCondition>,
    rows: usize,
    cols: usize,
    opacity: f64,
    grids: Vec<HeatmapGrid>,
    report: Option<ElementReport>,
    lifecycle: Lifecycle,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct HeatmapGrid {
    pub node_id: String,
    pub origin: Point,
    pub bin_width: f64,
    pub bin_height: f64,
    /// Row-major bin colors, `rows * cols` entries.
    pub colors: Vec<String>,
}

impl HeatmapElement {
    fn new(
        spec: &ElementSpec,
        conditions: Vec<CompiledCondition>,
        report: Option<ElementReport>,
    ) -> SimvizResult<Self> {
        let Some(Condition::Heatmap(c)) = conditions.first().map(CompiledCondition::condition)
        else {
            return Err(SimvizError::document(
                "heatmap element requires a heatmap condition",
            ));
        };
        let rows = c.data.first().map_or(0, Vec::len);
        let cols = c.data.first().and_then(|s| s.first()).map_or(0, Vec::len);
        let opacity = c.meta.opacity;

        Ok(Self {
            ids: spec.ids.clone(),
            description: spec.description.clone(),
            conditions,
            rows,
            cols,
            opacity,
            grids: Vec::new(),
            report,
            lifecycle: Lifecycle::Uninitialized,
        })
    }

    fn initialize(&mut self, doc: &Document) -> SimvizResult<()> {
        for id in &self.ids {
            let node = doc
                .node(id)
                .ok_or_else(|| SimvizError::document(format!("node '{id}' not found")))?;
            let bbox = node.bbox;
            self.grids.push(HeatmapGrid {
                node_id: id.clone(),
                origin: Point::new(bbox.x0, bbox.y0),
                bin_width: bbox.width() / self.cols as f64,
                bin_height: bbox.height() / self.rows as f64,
                colors: vec![String::new(); self.rows * self.cols],
            });
        }
        self.lifecycle = Lifecycle::Ready;
        Ok(())
    }

    fn update(&mut self, x: XIndex, doc: &mut Document) -> SimvizResult<()> {
        if self.lifecycle == Lifecycle::Uninitialized {
            self.initialize(doc)?;
        }

        let compiled = &self.conditions[0];
        let Condition::Heatmap(c) = compiled.condition() else {
            return Err(SimvizError::evaluation("heatmap condition was replaced"));
        };
        let slice = c.data.get(x.0).ok_or_else(|| {
            SimvizError::evaluation(format!("heatmap: index {} out of bounds", x.0))
        })?;
        if slice.len() != self.rows || slice.iter().any(|r| r.len() != self.cols) {
            return Err(SimvizError::evaluation(
                "heatmap: matrix shape changed across the series",
            ));
        }
        let scale = compiled.scale().ok_or_else(|| {
            SimvizError::evaluation("heatmap condition has no color scale")
        })?;

        // Rebind bin colors in place; grid geometry never changes.
        for grid in &mut self.grids {
            for (r, row) in slice.iter().enumerate() {
                for (col, &v) in row.iter().enumerate() {
                    grid.colors[r * self.cols + col] = scale.color(v).to_string();
                }
            }
        }

        if let Some(report) = &mut self.report {
            report.update(x, doc, &self.description, &self.conditions)?;
        }
        Ok(())
    }

    pub fn grids(&self) -> &[HeatmapGrid] {
        &self.grids
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }
}

/// Binary visibility switch over the bound nodes.
#[derive(Debug, serde::Serialize)]
pub struct ToggleElement {
    ids: Vec<String>,
    description: String,
    conditions: Vec<CompiledCondition>,
    report: Option<ElementReport>,
}

impl ToggleElement {
    fn new(
        spec: &ElementSpec,
        conditions: Vec<CompiledCondition>,
        report: Option<ElementReport>,
    ) -> SimvizResult<Self> {
        match conditions.first().map(CompiledCondition::condition) {
            Some(Condition::ShowHide(_) | Condition::Logical(_)) => {}
            _ => {
                return Err(SimvizError::document(
                    "toggle element requires a show_hide or logical condition",
                ));
            }
        }
        Ok(Self {
            ids: spec.ids.clone(),
            description: spec.description.clone(),
            conditions,
            report,
        })
    }

    fn update(&mut self, x: XIndex, doc: &mut Document) -> SimvizResult<()> {
        let visible = match self.conditions[0].condition() {
            Condition::ShowHide(c) => c.data.get(x.0).copied(),
            Condition::Logical(c) => c.data.get(x.0).copied(),
            _ => None,
        }
        .map(|d| d != 0.0)
        .ok_or_else(|| {
            SimvizError::evaluation(format!("toggle: index {} out of bounds", x.0))
        })?;

        for id in &self.ids {
            let node = doc
                .node_mut(id)
                .ok_or_else(|| SimvizError::document(format!("node '{id}' not found")))?;
            node.opacity = if visible { 1.0 } else { 0.0 };
        }

        if let Some(report) = &mut self.report {
            report.update(x, doc, &self.description, &self.conditions)?;
        }
        Ok(())
    }
}

/// Report-only element: no geometry of its own.
#[derive(Debug, serde::Serialize)]
pub struct ReportElement {
    description: String,
    conditions: Vec<CompiledCondition>,
    report: ElementReport,
}

impl ReportElement {
    fn update(&mut self, x: XIndex, doc: &mut Document) -> SimvizResult<()> {
        self.report
            .update(x, doc, &self.description, &self.conditions)
    }
}

/// Tabular report element.
#[derive(Debug, serde::Serialize)]
pub struct TableElement {
    description: String,
    anchor_id: String,
    headers: Vec<String>,
    tabular_data: Vec<Vec<Vec<String>>>,
    table: Option<TableLayout>,
}

impl TableElement {
    fn new(spec: &ElementSpec, conditions: Vec<CompiledCondition>) -> SimvizResult<Self> {
        let Some(Condition::TabularInfo(c)) = conditions.first().map(CompiledCondition::condition)
        else {
            return Err(SimvizError::document(
                "table element requires a tabular_info condition",
            ));
        };
        let anchor_id = spec.report_id.clone().ok_or_else(|| {
            SimvizError::document("table element requires a report_id anchor")
        })?;
        Ok(Self {
            description: spec.description.clone(),
            anchor_id,
            headers: c.headers.clone(),
            tabular_data: c.tabular_data.clone(),
            table: None,
        })
    }

    fn update(&mut self, x: XIndex, doc: &mut Document) -> SimvizResult<()> {
        if self.table.is_none() {
            self.table = Some(TableLayout::build(doc, &self.anchor_id, &self.headers)?);
        }
        if let Some(table) = &mut self.table {
            table.update(x, &self.tabular_data);
        }
        Ok(())
    }

    pub fn table(&self) -> Option<&TableLayout> {
        self.table.as_ref()
    }
}

/// Static color scale legend element.
#[derive(Debug, serde::Serialize)]
pub struct LegendElement {
    anchor_id: String,
    description: String,
    scale: ColorScale,
    opacity: f64,
    layout: Option<LegendLayout>,
}

impl LegendElement {
    fn from_spec(spec: &ElementSpec, conditions: Vec<CompiledCondition>) -> SimvizResult<Self> {
        let compiled = conditions.first().ok_or_else(|| {
            SimvizError::document("colorscale element requires a color_scale condition")
        })?;
        let Condition::ColorScale(c) = compiled.condition() else {
            return Err(SimvizError::document(
                "colorscale element requires a color_scale condition",
            ));
        };
        let anchor_id = spec.report_id.clone().ok_or_else(|| {
            SimvizError::document("colorscale element requires a report_id anchor")
        })?;
        let scale = compiled
            .scale()
            .cloned()
            .ok_or_else(|| SimvizError::document("color_scale condition has no scale"))?;
        Ok(Self {
            anchor_id,
            description: spec.description.clone(),
            scale,
            opacity: c.meta.opacity,
            layout: None,
        })
    }

    /// Renders once; the legend never changes with the time index.
    fn update(&mut self, doc: &mut Document) -> SimvizResult<()> {
        if self.layout.is_none() {
            self.layout = Some(LegendLayout::build(
                doc,
                &self.anchor_id,
                &self.description,
                &self.scale,
                self.opacity,
            )?);
        }
        Ok(())
    }

    pub fn layout(&self) -> Option<&LegendLayout> {
        self.layout.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        document::Node,
        model::{ConditionMeta, HeatmapCondition, ShowHideCondition, TabularInfoCondition},
        pattern::PatternState,
    };
    use kurbo::Rect;

    fn doc_with(ids: &[&str]) -> Document {
        let mut doc = Document::new();
        for id in ids {
            doc.insert_node(*id, Node::with_bbox(Rect::new(0.0, 0.0, 40.0, 100.0)));
        }
        doc
    }

    fn cell_spec(ids: &[&str], conditions: Vec<Condition>) -> ElementSpec {
        ElementSpec {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            description: "test".to_string(),
            conditions,
            report_id: None,
        }
    }

    fn level_static_json() -> Condition {
        serde_json::from_str(
            r##"{"type":"level_static","data":[0.0,5.0,10.0],"color":"#fff",
               "min_height":0.0,"max_height":10.0}"##,
        )
        .unwrap()
    }

    #[test]
    fn from_spec_rejects_dangling_node_ids() {
        let doc = doc_with(&["tank"]);
        let spec = cell_spec(&["ghost"], vec![level_static_json()]);
        assert!(
            Element::from_spec(ElementKind::Cell, &spec, &doc, PatternEncoding::Banded).is_err()
        );
    }

    #[test]
    fn cell_builds_one_pattern_per_bound_node() {
        let mut doc = doc_with(&["a", "b"]);
        let spec = cell_spec(&["a", "b"], vec![level_static_json()]);
        let mut element =
            Element::from_spec(ElementKind::Cell, &spec, &doc, PatternEncoding::Banded).unwrap();

        element.update(XIndex(1), &mut doc).unwrap();
        element.update(XIndex(2), &mut doc).unwrap();

        let Element::Cell(cell) = &element else { panic!() };
        assert_eq!(cell.compiler().len(), 2);
        let Some(PatternState::Banded { bands, .. }) = cell.compiler().state("pattern_a") else {
            panic!()
        };
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].order, 1.0);
        assert_eq!(bands[0].y, 0.0);
    }

    #[test]
    fn toggle_drives_node_opacity() {
        let mut doc = doc_with(&["flame"]);
        let spec = ElementSpec {
            ids: vec!["flame".to_string()],
            description: "fire".to_string(),
            conditions: vec![Condition::ShowHide(ShowHideCondition {
                meta: ConditionMeta::default(),
                data: vec![0.0, 1.0],
            })],
            report_id: None,
        };
        let mut element =
            Element::from_spec(ElementKind::Toggle, &spec, &doc, PatternEncoding::Banded).unwrap();

        element.update(XIndex(0), &mut doc).unwrap();
        assert_eq!(doc.node("flame").unwrap().opacity, 0.0);
        element.update(XIndex(1), &mut doc).unwrap();
        assert_eq!(doc.node("flame").unwrap().opacity, 1.0);
    }

    #[test]
    fn heatmap_grid_shape_is_fixed_from_first_step() {
        let mut doc = doc_with(&["core"]);
        let spec = ElementSpec {
            ids: vec!["core".to_string()],
            description: "core".to_string(),
            conditions: vec![Condition::Heatmap(HeatmapCondition {
                meta: ConditionMeta::default(),
                data: vec![
                    vec![vec![0.0, 49.0], vec![51.0, 99.0]],
                    vec![vec![99.0, 0.0], vec![0.0, 49.0]],
                ],
                scale: ScaleSpec {
                    palette: vec!["cold".to_string(), "hot".to_string()],
                    levels: vec![0.0, 100.0],
                },
            })],
            report_id: None,
        };
        let mut element =
            Element::from_spec(ElementKind::Heatmap, &spec, &doc, PatternEncoding::Banded)
                .unwrap();

        element.update(XIndex(0), &mut doc).unwrap();
        let Element::Heatmap(heatmap) = &element else {
            panic!()
        };
        assert_eq!(heatmap.shape(), (2, 2));
        let grid = &heatmap.grids()[0];
        assert_eq!(grid.bin_width, 20.0);
        assert_eq!(grid.bin_height, 50.0);
        assert_eq!(grid.colors, vec!["cold", "cold", "hot", "hot"]);

        element.update(XIndex(1), &mut doc).unwrap();
        let Element::Heatmap(heatmap) = &element else {
            panic!()
        };
        assert_eq!(heatmap.grids()[0].colors, vec!["hot", "cold", "cold", "cold"]);
    }

    #[test]
    fn table_renders_exactly_the_current_rows() {
        let mut doc = doc_with(&["panel"]);
        let spec = ElementSpec {
            ids: Vec::new(),
            description: "results".to_string(),
            conditions: vec![Condition::TabularInfo(TabularInfoCondition {
                meta: ConditionMeta::default(),
                tabular_data: vec![
                    vec![vec!["1".to_string(), "2".to_string()]],
                    vec![vec!["3".to_string(), "4".to_string()]],
                ],
                headers: vec!["A".to_string(), "B".to_string()],
            })],
            report_id: Some("panel".to_string()),
        };
        let mut element =
            Element::from_spec(ElementKind::Table, &spec, &doc, PatternEncoding::Banded).unwrap();

        element.update(XIndex(0), &mut doc).unwrap();
        element.update(XIndex(1), &mut doc).unwrap();

        let Element::Table(table) = &element else {
            panic!()
        };
        let layout = table.table().unwrap();
        assert_eq!(layout.headers, vec!["A", "B"]);
        assert_eq!(layout.rows.len(), 1);
        assert_eq!(layout.rows[0], vec!["3".to_string(), "4".to_string()]);
    }

    #[test]
    fn eval_failure_leaves_last_good_pattern_state() {
        let mut doc = doc_with(&["tank"]);
        // Zero height span: evaluation fails at every index.
        let bad: Condition = serde_json::from_str(
            r##"{"type":"level_static","data":[1.0,2.0],"color":"#fff",
               "min_height":5.0,"max_height":5.0}"##,
        )
        .unwrap();
        let good = level_static_json();

        let spec = cell_spec(&["tank"], vec![good]);
        let mut element =
            Element::from_spec(ElementKind::Cell, &spec, &doc, PatternEncoding::Banded).unwrap();
        element.update(XIndex(1), &mut doc).unwrap();

        let bad_spec = cell_spec(&["tank"], vec![bad]);
        let mut bad_element =
            Element::from_spec(ElementKind::Cell, &bad_spec, &doc, PatternEncoding::Banded)
                .unwrap();
        assert!(bad_element.update(XIndex(0), &mut doc).is_err());

        // The earlier element's pattern is untouched by the failed update.
        let Element::Cell(cell) = &element else { panic!() };
        let Some(PatternState::Banded { bands, .. }) =
            cell.compiler().state("pattern_tank")
        else {
            panic!()
        };
        assert_eq!(bands[0].order, 0.5);
    }
}
