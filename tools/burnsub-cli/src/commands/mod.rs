pub mod burn;
pub mod check;
pub mod edit;
pub mod preview;
pub mod segment;
pub mod subtitles;
