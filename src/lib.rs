#![forbid(unsafe_code)]

pub mod condition;
pub mod context;
pub mod core;
pub mod document;
pub mod element;
pub mod error;
pub mod model;
pub mod pattern;
pub mod playback;
pub mod report;
pub mod scale;
pub mod viewport;

pub use condition::{CompiledCondition, Evaluation, ORDER_FULL, PropertyTuple};
pub use context::ElementContext;
pub use core::{XIndex, format_value};
pub use document::{Document, Node, Paint};
pub use element::Element;
pub use error::{SimvizError, SimvizResult};
pub use model::{Condition, ElementKind, ElementSpec, VisPayload};
pub use pattern::{PaintTarget, PatternCompiler, PatternEncoding, PatternState};
pub use playback::{PlayState, PlaybackController};
pub use scale::ColorScale;
pub use viewport::ViewTransform;
