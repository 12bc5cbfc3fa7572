//! Hardware module for telescope and detector configurations

pub mod detector;
pub mod telescope;

pub use detector::DetectorConfig;
pub use telescope::{PsfSampling, TelescopeConfig};
