// medcart/src/pipeline/execution.rs

//! `Pipeline::run`: walks the steps in order and drives each phase's handlers.

use super::context_data::ContextData;
use super::control::{PipelineControl, PipelineResult};
use super::definition::{Phase, Pipeline};
use crate::error::PipelineError;
use tracing::{event, info_span, Instrument, Level};

enum StepOutcome {
  Finished,
  Stopped,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx_data`.
  ///
  /// The first handler error aborts the run and is returned unchanged. A
  /// handler returning [`PipelineControl::Stop`] ends the run with
  /// [`PipelineResult::Stopped`].
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    if let Some(step_name) = self.unknown_steps.first() {
      return Err(Err::from(PipelineError::StepNotFound {
        step_name: step_name.clone(),
      }));
    }

    event!(Level::DEBUG, num_steps = self.steps.len(), "Pipeline execution starting.");

    for (step_index, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let has_handlers = [Phase::Before, Phase::On, Phase::After]
        .iter()
        .any(|phase| !self.handlers(*phase, step_name).is_empty());

      if !has_handlers {
        if step_def.optional {
          event!(Level::DEBUG, step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step_name, "Non-optional step has no handlers.");
        return Err(Err::from(PipelineError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = info_span!("pipeline_step", step_name, step_index);
      match self.run_step(step_name, &ctx_data).instrument(step_span).await? {
        StepOutcome::Finished => {}
        StepOutcome::Stopped => return Ok(PipelineResult::Stopped),
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_name: &str, ctx_data: &ContextData<TData>) -> Result<StepOutcome, Err> {
    for phase in [Phase::Before, Phase::On, Phase::After] {
      for handler_fn in self.handlers(phase, step_name) {
        match handler_fn(ctx_data.clone()).await {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => {
            event!(Level::INFO, phase = phase.label(), "Pipeline stopped by handler.");
            return Ok(StepOutcome::Stopped);
          }
          Err(e) => {
            event!(Level::WARN, phase = phase.label(), error = %e, "Step handler failed.");
            return Err(e);
          }
        }
      }
    }
    Ok(StepOutcome::Finished)
  }
}
