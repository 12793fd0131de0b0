pub mod conflicts;
pub mod lifecycle;
pub mod reviews;
