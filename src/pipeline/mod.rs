//! Staged banner rendering pipeline.

pub mod barrier;
pub mod executor;
pub mod orchestrator;

pub use barrier::PrepareBarrier;
pub use executor::{InlineExecutor, UiExecutor, UiThreadExecutor};
pub use orchestrator::{BannerPipeline, PipelineState};
