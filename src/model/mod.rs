//! Decoded data model.
//!
//! Field values, record models and the synthetic nodes introduced while
//! reconstructing the document tree.

mod node;
mod text;
mod value;

pub use node::*;
pub use text::*;
pub use value::*;
