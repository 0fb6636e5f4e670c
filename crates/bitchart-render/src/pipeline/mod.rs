//! Render pipelines for the four chart programs.

pub mod candle;
pub mod grid;
pub mod line;
pub mod shared;
pub mod traits;
pub mod volume;

pub use candle::CandlePipeline;
pub use grid::GridPipeline;
pub use line::LinePipeline;
pub use shared::PipelineFactory;
pub use traits::{InstancedPipeline, Pipeline};
pub use volume::VolumePipeline;
