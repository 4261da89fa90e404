pub mod engine;
#[allow(clippy::module_inception)]
pub mod error;
pub mod task;

pub use engine::EngineError;
pub use error::CliError;
pub use task::TaskError;
