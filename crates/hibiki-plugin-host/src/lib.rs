//! VST3 plugin hosting adapter for the Hibiki engine, plus a mock plugin
//! used as the testability seam in place of a live plugin binary.

pub mod error;
pub mod mock;
pub mod scanner;
pub mod vst3;

pub use error::Vst3Error;
pub use mock::MockPlugin;
pub use scanner::{Vst3PluginInfo, Vst3Scanner};
pub use vst3::Vst3Plugin;
