pub mod axis;
pub mod engine;
pub mod registry;
pub mod scheduler;
pub mod surface;
pub mod svg;
pub mod text;
pub mod view;
pub mod viewport;

pub use engine::{FrameSummary, RenderContext, hit_test, render};
pub use surface::{RecordingSurface, Surface};
pub use view::{HostView, ViewEvent, WaterfallView};
