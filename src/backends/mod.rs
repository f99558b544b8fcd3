//! Backend implementations for segmentation inference
//!
//! The only production backend is Tract: pure Rust, CPU-only, no native
//! runtime to install. The trait seam keeps it replaceable.

pub mod tract;

#[cfg(test)]
pub mod test_utils;

pub use self::tract::TractBackend;
