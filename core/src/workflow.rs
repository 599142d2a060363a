use serde::Serialize;
use tracing::instrument;

use crate::{
    assertions::{self, ExecutionStrategy, Expectations, ValidationReport},
    completion::{Client, CompletionModel, Extractor},
    error::Error,
};

/// System prompt for order extraction
pub const EXTRACTION_PREAMBLE: &str = "You turn customer messages into structured records \
by calling the provided tool. Always write your reasoning in the chain_of_thought field \
before filling in any other field. Use \"None\" for text you can neither find nor infer \
with certainty, and -1 for a missing numeric locator.";

/// Extract-then-check round trip over a single [`Client`].
///
/// Every extraction is one-shot: only the preamble and the input are sent, so
/// results never depend on earlier calls.
pub struct ExtractionWorkflow<M: CompletionModel> {
    client: Client<M>,
    strategy: ExecutionStrategy,
}

impl<M: CompletionModel> ExtractionWorkflow<M> {
    pub fn new(client: Client<M>) -> Self {
        Self {
            client,
            strategy: ExecutionStrategy::default(),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn client(&self) -> &Client<M> {
        &self.client
    }

    /// Asks the model to fill in `T` from `input`
    #[instrument(skip_all, fields(extractor = std::any::type_name::<T>(), input_len = input.len()))]
    pub async fn extract<T: Extractor>(&mut self, input: &str) -> Result<T, Error> {
        self.client
            .prompt(input)
            .one_shot(true, None)
            .extract::<T>()
            .await
    }

    /// Evaluates `expectations` against `result` with the workflow's strategy
    pub fn validate<T: Serialize>(
        &self,
        result: &T,
        expectations: &Expectations,
    ) -> Result<ValidationReport, Error> {
        assertions::validate(result, expectations, self.strategy)
    }

    /// [`extract`](Self::extract) followed by [`validate`](Self::validate)
    pub async fn run<T: Extractor + Serialize>(
        &mut self,
        input: &str,
        expectations: &Expectations,
    ) -> Result<(T, ValidationReport), Error> {
        let result = self.extract::<T>(input).await?;
        let report = self.validate(&result, expectations)?;
        Ok((result, report))
    }
}
