use music_domain::MusicError;
use std::sync::Arc;
use tracing::instrument;

use crate::fsm::{EvalOutcome, FsmEngine};

/// Use case behind the `step-fsm` admin command: run exactly one
/// evaluation of one zone, optionally disambiguating the next state.
/// Works for manual-mode zones, which the tickers never touch.
pub struct StepFsmUseCase {
    engine: Arc<FsmEngine>,
}

impl StepFsmUseCase {
    pub fn new(engine: Arc<FsmEngine>) -> Self {
        Self { engine }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        zone: &str,
        next_state: Option<&str>,
    ) -> Result<EvalOutcome, MusicError> {
        self.engine.evaluate(zone, next_state).await
    }
}
