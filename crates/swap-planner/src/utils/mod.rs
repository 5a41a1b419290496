pub mod format;
pub mod scenario;
