//! Burnsub Processing Core
//!
//! Turns transcripts into caption segments:
//! - **Segmenter:** Group word timestamps into short display segments,
//!   splitting on a word budget or a speech pause
//! - **Fallback:** Collapse plain-text transcripts into one whole-clip segment
//!
//! This crate is pure computation: no I/O, no clocks, no randomness.
//! All inputs are data; all outputs are data.

pub mod segmenter;

pub use segmenter::{Segmenter, SegmenterConfig};
