//! Validation source strategies.
//!
//! Only the filesystem strategy exists. A `ValidationSource` trait can be
//! introduced when a second concrete source needs one.

pub mod fs;
