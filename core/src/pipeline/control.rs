// medcart/src/pipeline/control.rs

//! Flow-control signals returned by step handlers and by a whole run.

/// Returned by a handler: keep going, or halt the pipeline right here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Skip every remaining handler and step. The run reports
  /// [`PipelineResult::Stopped`] rather than an error.
  Stop,
}

/// Outcome of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  Stopped,
}
