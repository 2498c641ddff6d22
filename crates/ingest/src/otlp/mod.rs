pub mod decode;

pub use decode::{decode_request, decode_span};
