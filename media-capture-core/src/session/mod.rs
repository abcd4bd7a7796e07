pub mod drain;
pub mod recorder;
