//! Extract command implementation.

use crate::answers::{AnswerSource, NonInteractive, TerminalAnswers};
use crate::cli::ExtractArgs;
use crate::config::{Config, OutputFormat, ProviderConfig, ProviderKind};
use crate::document::read_document;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use lectio_domain::Oracle;
use lectio_extractor::{ExtractionRequest, ExtractionResult, Extractor, ExtractorConfig};
use lectio_llm::{anthropic, ollama, AnthropicOracle, OllamaOracle};
use tracing::info;

/// Execute the extract command.
pub async fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let text = read_document(&args.file)?;

    let provider = config
        .provider
        .clone()
        .with_overrides(args.provider, args.model.clone());
    let mut extractor_config = config.extractor.clone();
    if let Some(rounds) = args.max_rounds {
        extractor_config.max_clarification_rounds = rounds;
    }
    extractor_config.validate().map_err(CliError::Config)?;

    info!(
        "Extracting {} with {:?} model {}",
        args.file.display(),
        provider.kind,
        provider.model
    );

    let mut answers: Box<dyn AnswerSource> = if args.non_interactive {
        Box::new(NonInteractive)
    } else {
        Box::new(TerminalAnswers::new(formatter.clone())?)
    };

    let result = match provider.kind {
        ProviderKind::Ollama => {
            let extractor = Extractor::new(ollama_oracle(&provider), extractor_config);
            run_extraction(&extractor, text, answers.as_mut()).await?
        }
        ProviderKind::Anthropic => {
            let extractor = Extractor::new(anthropic_oracle(&provider, &extractor_config)?, extractor_config);
            run_extraction(&extractor, text, answers.as_mut()).await?
        }
    };

    report(&result, formatter)
}

fn ollama_oracle(provider: &ProviderConfig) -> OllamaOracle {
    let endpoint = provider
        .endpoint
        .clone()
        .unwrap_or_else(|| ollama::DEFAULT_ENDPOINT.to_string());
    OllamaOracle::new(endpoint, provider.model.clone()).with_max_retries(provider.max_retries)
}

fn anthropic_oracle(provider: &ProviderConfig, config: &ExtractorConfig) -> Result<AnthropicOracle> {
    let oracle = AnthropicOracle::from_env_var(&provider.api_key_env, provider.model.clone())?
        .with_endpoint(
            provider
                .endpoint
                .clone()
                .unwrap_or_else(|| anthropic::DEFAULT_ENDPOINT.to_string()),
        )
        .with_max_retries(provider.max_retries)
        .with_timeout(config.oracle_timeout());
    Ok(oracle)
}

/// Run the pipeline, answering clarification rounds until it settles.
///
/// Returns the clarification request itself when `answers` declines to
/// answer.
pub async fn run_extraction<O: Oracle>(
    extractor: &Extractor<O>,
    text: String,
    answers: &mut dyn AnswerSource,
) -> Result<ExtractionResult> {
    let mut request = ExtractionRequest::new(text);
    loop {
        match extractor.extract(request).await {
            ExtractionResult::NeedsClarification(clarification) => {
                match answers.collect(&clarification)? {
                    Some(answered) => request = clarification.answer(&answered),
                    None => return Ok(ExtractionResult::NeedsClarification(clarification)),
                }
            }
            settled => return Ok(settled),
        }
    }
}

/// Print the outcome and map it to the command's result.
fn report(result: &ExtractionResult, formatter: &Formatter) -> Result<()> {
    match result {
        ExtractionResult::Success(_) => {
            println!("{}", formatter.format_result(result)?);
            Ok(())
        }
        ExtractionResult::NeedsClarification(clarification) => {
            println!("{}", formatter.format_result(result)?);
            Err(CliError::NeedsClarification(clarification.questions.len()))
        }
        ExtractionResult::Failure(e) => {
            if formatter.format() == OutputFormat::Json {
                println!("{}", formatter.format_result(result)?);
            }
            Err(CliError::Extraction(e.clone()))
        }
    }
}
