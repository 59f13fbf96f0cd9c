//! Burnsub Caption Model
//!
//! Defines the data contracts shared by every burnsub stage:
//! - **Word:** A recognized word with onset/offset timestamps
//! - **Segment:** A displayable caption unit, optionally carrying word timing
//! - **CaptionTrack:** The persisted, editable segment list
//!
//! All times are seconds on the source media timeline.

pub mod segment;
pub mod track;
pub mod word;

pub use segment::*;
pub use track::*;
pub use word::*;
