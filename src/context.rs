use crate::{
    core::{XIndex, format_value},
    document::Document,
    element::Element,
    error::SimvizResult,
    model::VisPayload,
    pattern::PatternEncoding,
};

/// Orchestration root: owns the x-series, the document, and the element
/// collection, and fans updates out to every element.
///
/// Construction is the only fatal boundary. Once built, per-element failures
/// never escape an update fan-out: the failing element keeps its last-good
/// visual state for that tick and rendering continues for all others.
pub struct ElementContext {
    x_series: Vec<f64>,
    document: Document,
    elements: Vec<Element>,
    current_x: XIndex,
    current_label: String,
}

impl ElementContext {
    pub fn new(payload: VisPayload, document: Document) -> SimvizResult<Self> {
        Self::with_encoding(payload, document, PatternEncoding::default())
    }

    #[tracing::instrument(skip(payload, document))]
    pub fn with_encoding(
        payload: VisPayload,
        mut document: Document,
        encoding: PatternEncoding,
    ) -> SimvizResult<Self> {
        payload.validate()?;

        for (id, source) in &payload.overlays {
            document.insert_overlay(id, source);
        }

        let mut elements = Vec::new();
        for (kind, specs) in &payload.element_data {
            for spec in specs {
                match Element::from_spec(*kind, spec, &document, encoding) {
                    Ok(element) => elements.push(element),
                    Err(err) => {
                        tracing::warn!(?kind, ids = ?spec.ids, %err, "skipping element");
                    }
                }
            }
        }
        for legend in &payload.color_scales {
            match Element::standalone_legend(legend, &document) {
                Ok(element) => elements.push(element),
                Err(err) => {
                    tracing::warn!(id = %legend.id, %err, "skipping standalone legend");
                }
            }
        }

        let mut context = Self {
            x_series: payload.x_series,
            document,
            elements,
            current_x: XIndex(0),
            current_label: String::new(),
        };
        context.update_elements(XIndex(0));
        Ok(context)
    }

    pub fn series_len(&self) -> usize {
        self.x_series.len()
    }

    pub fn x_series(&self) -> &[f64] {
        &self.x_series
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn current_x(&self) -> XIndex {
        self.current_x
    }

    /// Formatted label of the current x-series value.
    pub fn current_label(&self) -> &str {
        &self.current_label
    }

    /// Single entry point for time index changes: updates every element in
    /// registration order. Elements are independent; one failing update is
    /// logged and the fan-out continues.
    #[tracing::instrument(skip(self))]
    pub fn update_elements(&mut self, x: XIndex) {
        let Some(value) = self.x_series.get(x.0) else {
            tracing::warn!(x = x.0, "update index out of bounds; ignoring");
            return;
        };
        self.current_x = x;
        self.current_label = format_value(*value);

        let document = &mut self.document;
        for element in &mut self.elements {
            if let Err(err) = element.update(x, document) {
                tracing::warn!(
                    kind = element.kind_name(),
                    description = element.description(),
                    %err,
                    "element update failed; keeping last-good state"
                );
            }
        }
    }
}
