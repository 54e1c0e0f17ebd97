use std::collections::BTreeMap;

use kurbo::Rect;

use crate::error::{SimvizError, SimvizResult};

/// Paint applied to a node's fill or stroke. A reference names a pattern,
/// gradient, or overlay primitive by id.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Paint {
    #[default]
    None,
    Color(String),
    Reference(String),
}

/// One addressable node of the vector document.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub bbox: Rect,
    #[serde(default)]
    pub fill: Paint,
    #[serde(default)]
    pub stroke: Paint,
    #[serde(default = "default_one")]
    pub fill_opacity: f64,
    #[serde(default = "default_one")]
    pub opacity: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_one() -> f64 {
    1.0
}

fn default_visible() -> bool {
    true
}

impl Node {
    pub fn with_bbox(bbox: Rect) -> Self {
        Self {
            bbox,
            fill: Paint::None,
            stroke: Paint::None,
            fill_opacity: 1.0,
            opacity: 1.0,
            visible: true,
        }
    }
}

/// Minimal retained model of the vector-graphics surface the engine
/// manipulates. Loading and parsing a real SVG file is an external concern;
/// the document arrives pre-resolved as nodes keyed by id.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Document {
    nodes: BTreeMap<String, Node>,
    /// Shared defs area: overlay texture id -> opaque markup.
    #[serde(default)]
    overlays: BTreeMap<String, String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&mut self, id: impl Into<String>, node: Node) {
        self.nodes.insert(id.into(), node);
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn hide(&mut self, id: &str) -> SimvizResult<()> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| SimvizError::document(format!("node '{id}' not found")))?;
        node.visible = false;
        Ok(())
    }

    /// Insert-once semantics: re-registering an overlay id keeps the first
    /// definition, matching a defs area that is only ever appended to.
    pub fn insert_overlay(&mut self, id: impl Into<String>, source: impl Into<String>) {
        self.overlays.entry(id.into()).or_insert_with(|| source.into());
    }

    pub fn has_overlay(&self, id: &str) -> bool {
        self.overlays.contains_key(id)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Union of all node bounding boxes; the pan/zoom clamp extents.
    pub fn extents(&self) -> Rect {
        let mut nodes = self.nodes.values();
        let Some(first) = nodes.next() else {
            return Rect::ZERO;
        };
        nodes.fold(first.bbox, |acc, n| acc.union(n.bbox))
    }
}
