pub mod config;
pub mod error;
pub mod format;
pub mod layout;
pub mod model;
pub mod palette;
pub mod time;

pub use error::{Result, TracefallError};
pub use layout::compute_layout;
pub use model::span::{LayoutSpan, RawSpan, TraceLayout};
