//! Result persistence port.

use crate::domain::error::OverlayError;
use crate::domain::pipeline::PipelineResult;
use std::path::Path;

/// Port for writing the outputs of a pipeline run.
pub trait ResultSink {
    fn write(&self, result: &PipelineResult, output_dir: &Path) -> Result<(), OverlayError>;
}
