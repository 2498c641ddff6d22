pub mod batch;
pub mod coerce;
pub mod columns;
pub mod json;
pub mod otlp;
pub mod source;

pub use batch::{Cell, Column, ColumnBatch};
pub use columns::{SpanColumns, adapt_batch, resolve_columns, try_adapt_batch};
pub use source::{SourceFormat, load_spans};
