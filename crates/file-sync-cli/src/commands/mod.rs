pub mod format;
pub mod plan;
pub mod sync;
