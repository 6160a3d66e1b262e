pub mod format;
pub mod set;
