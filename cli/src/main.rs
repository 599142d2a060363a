use orderly::assertions::{AssertionFailure, ValidationReport};
use orderly::prelude::*;
use orderly_anthropic::AnthropicCompletionModel;
use scenarios::{Profile, Scenario};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod scenarios;

const COT_PREVIEW_CHARS: usize = 50;

#[client(
    provider = "AnthropicCompletionModel",
    config = r#"{
      "model": "claude-3-5-sonnet-20240620",
      "timeout_secs": 60
    }"#,
    max_tokens = 1024
)]
struct OrderClient;

async fn run_scenario<S, M>(
    workflow: &mut ExtractionWorkflow<M>,
    scenario: &Scenario,
) -> Result<ValidationReport, Error>
where
    S: Schedule,
    M: CompletionModel,
    ExtractionResult<S>: Extractor,
{
    println!("== {} ({} profile) ==", scenario.name, S::PROFILE);
    let (result, report) = workflow
        .run::<ExtractionResult<S>>(scenario.input, &scenario.expectations())
        .await?;
    let preview: String = result
        .chain_of_thought
        .chars()
        .take(COT_PREVIEW_CHARS)
        .collect();
    println!("Chain of thought: {preview}...");
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orderly=info,orderly_anthropic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let selected = scenarios::select(&args)?;
    let mut workflow = ExtractionWorkflow::new(OrderClient::build(EXTRACTION_PREAMBLE)?);

    let mut first_failure: Option<AssertionFailure> = None;
    for scenario in &selected {
        info!(scenario = scenario.name, "Running scenario");
        let report = match scenario.profile {
            Profile::Text => run_scenario::<TextSchedule, _>(&mut workflow, scenario).await?,
            Profile::Structured => {
                run_scenario::<StructuredSchedule, _>(&mut workflow, scenario).await?
            }
        };
        println!("{report}\n");
        if let Err(failure) = report.into_result() {
            first_failure.get_or_insert(failure);
        }
    }

    if let Some(usage) = workflow.client().token_usage().total_tokens {
        info!(total_tokens = usage, "Finished");
    }
    match first_failure {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}
