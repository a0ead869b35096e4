//! Flattening nested documents into records and rebuilding them
//!
//! Both directions join key-path segments with the same separator (`_` by
//! default). A literal separator inside an original key cannot be told
//! apart from a path join, so the two directions are not inverses once keys
//! contain the separator or values contain arrays.

pub mod flattener;
pub mod reconstruct;

pub use flattener::{flatten, Flattener, SCALAR_KEY};
pub use reconstruct::{reconstruct, Reconstructor};
