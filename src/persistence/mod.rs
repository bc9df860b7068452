//! YAML representation of account resources: loading and writing.

pub mod loader;
pub mod model;
pub mod writer;

pub use loader::load;
pub use writer::{write, WriterContext};
