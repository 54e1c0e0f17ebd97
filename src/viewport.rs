use kurbo::Rect;

pub const MIN_SCALE: f64 = 1.0;
pub const MAX_SCALE: f64 = 8.0;

/// Pan/zoom transform over the document viewbox. Pure numeric: event
/// plumbing belongs to the host. The translate clamp keeps the scaled
/// viewbox from exposing space beyond the document extents.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ViewTransform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
    pub enabled: bool,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            tx: 0.0,
            ty: 0.0,
            enabled: true,
        }
    }
}

impl ViewTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Applies a zoom event against the given extents. Ignored while
    /// disabled.
    pub fn zoom(&mut self, extents: Rect, scale: f64, tx: f64, ty: f64) {
        if !self.enabled {
            return;
        }
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        let max_width = extents.width();
        let max_height = extents.height();

        let tx = tx.max(-(extents.x1 * scale - max_width)).min(extents.x0);
        let ty = ty.max(-(extents.y1 * scale - max_height)).min(extents.y0);

        self.scale = scale;
        self.tx = tx;
        self.ty = ty;
    }
}
