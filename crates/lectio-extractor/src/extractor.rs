//! Core Extractor implementation

use crate::assembler::ResultAssembler;
use crate::batcher::ConcurrencyBatcher;
use crate::clarification::ClarificationPolicy;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::header::HeaderExtractor;
use crate::invoke::{DocumentReply, SegmentExtractor};
use crate::segmenter::DocumentSegmenter;
use crate::strategy::{Strategy, StrategySelector};
use crate::text::char_len;
use crate::types::{
    ExtractedStudy, ExtractionMetadata, ExtractionRequest, ExtractionResult, Fidelity,
};
use lectio_domain::{ClarifyingQuestion, Oracle, ParsedStudy};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// The Extractor turns document text into a study
///
/// Every call returns an [`ExtractionResult`]; errors inside the pipeline are
/// reported as `Failure`, never raised.
pub struct Extractor<O: Oracle> {
    oracle: Arc<O>,
    config: ExtractorConfig,
    segmenter: DocumentSegmenter,
}

/// What one strategy attempt produced
enum Outcome {
    Study {
        study: ParsedStudy,
        stats: RunStats,
    },
    Clarification(Vec<ClarifyingQuestion>),
}

#[derive(Debug, Clone, Copy)]
struct RunStats {
    strategy: Strategy,
    segments_total: usize,
    segments_dropped: usize,
    segments_salvaged: usize,
}

impl RunStats {
    fn single(strategy: Strategy, salvaged: bool) -> Self {
        Self {
            strategy,
            segments_total: 1,
            segments_dropped: 0,
            segments_salvaged: usize::from(salvaged),
        }
    }
}

impl<O: Oracle> Extractor<O> {
    /// Create a new Extractor
    pub fn new(oracle: O, config: ExtractorConfig) -> Self {
        Self::from_arc(Arc::new(oracle), config)
    }

    /// Create an Extractor sharing an oracle
    pub fn from_arc(oracle: Arc<O>, config: ExtractorConfig) -> Self {
        let segmenter = DocumentSegmenter::new(config.min_segment_chars);
        Self {
            oracle,
            config,
            segmenter,
        }
    }

    /// Replace the document segmenter
    pub fn with_segmenter(mut self, segmenter: DocumentSegmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract a study from a document
    pub async fn extract(&self, request: ExtractionRequest) -> ExtractionResult {
        self.extract_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Extract a study, aborting when `cancel` fires
    ///
    /// A cancelled run reports `Failure(Cancelled)` and discards any
    /// segments already collected.
    pub async fn extract_with_cancel(
        &self,
        request: ExtractionRequest,
        cancel: CancellationToken,
    ) -> ExtractionResult {
        let start_time = Instant::now();
        let run_id = Uuid::now_v7();

        info!(
            "Starting extraction {}: {} chars, clarification round {}",
            run_id,
            char_len(&request.text),
            request.round
        );

        match self.run(&request, &cancel).await {
            Ok(Outcome::Study { study, stats }) => {
                let fidelity = if stats.segments_salvaged > 0 {
                    Fidelity::Salvaged
                } else {
                    Fidelity::Exact
                };
                let metadata = ExtractionMetadata {
                    run_id,
                    strategy: stats.strategy,
                    segments_total: stats.segments_total,
                    segments_dropped: stats.segments_dropped,
                    segments_salvaged: stats.segments_salvaged,
                    processing_time_ms: start_time.elapsed().as_millis() as u64,
                };

                info!(
                    "Extraction {} complete via {}: {} weeks, {} days, {} questions ({:?})",
                    run_id,
                    stats.strategy,
                    study.weeks.len(),
                    study.total_days(),
                    study.total_questions(),
                    fidelity
                );

                ExtractionResult::Success(ExtractedStudy {
                    study,
                    fidelity,
                    metadata,
                })
            }
            Ok(Outcome::Clarification(questions)) => {
                let policy = ClarificationPolicy::new(self.config.max_clarification_rounds);
                match policy.review(&request, questions) {
                    Ok(clarification) => ExtractionResult::NeedsClarification(clarification),
                    Err(e) => ExtractionResult::Failure(e),
                }
            }
            Err(e) => {
                warn!("Extraction {} failed: {}", run_id, e);
                ExtractionResult::Failure(e)
            }
        }
    }

    async fn run(
        &self,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ExtractorError> {
        self.config.validate().map_err(ExtractorError::Config)?;

        if request.text.trim().is_empty() {
            return Err(ExtractorError::EmptyInput);
        }
        if request.round > self.config.max_clarification_rounds {
            return Err(ExtractorError::ClarificationLimitExceeded(
                self.config.max_clarification_rounds,
            ));
        }
        if cancel.is_cancelled() {
            return Err(ExtractorError::Cancelled);
        }

        let selector = StrategySelector::from_config(&self.config);
        let mut strategy = selector.select(&request.text);
        info!("Selected strategy: {}", strategy);

        loop {
            let attempt = match strategy {
                Strategy::Segmented => self.run_segmented(request, &selector, cancel).await,
                Strategy::FullDocument => {
                    self.run_single(&request.text, strategy, request, cancel)
                        .await
                }
                Strategy::ConciseSingle => {
                    let capped = selector.cap_text(&request.text);
                    self.run_single(capped, strategy, request, cancel).await
                }
            };

            match attempt {
                Err(ExtractorError::OutputTruncated) => match selector.fallback(strategy) {
                    Some(next) => {
                        warn!(
                            "{} output truncated beyond recovery, falling back to {}",
                            strategy, next
                        );
                        strategy = next;
                    }
                    None => return Err(ExtractorError::OutputTruncated),
                },
                other => return other,
            }
        }
    }

    /// One call over the whole (possibly capped) document
    async fn run_single(
        &self,
        text: &str,
        strategy: Strategy,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ExtractorError> {
        let extractor = SegmentExtractor::new(self.oracle.as_ref(), &self.config);
        let variant = StrategySelector::prompt_variant(strategy);

        let reply = cancellable(
            cancel,
            extractor.extract_document(text, variant, request.transcript()),
        )
        .await?;

        match reply {
            DocumentReply::Clarification(questions) => Ok(Outcome::Clarification(questions)),
            DocumentReply::Study(fragment) => {
                let mut study = fragment.value;
                if study.title.trim().is_empty() {
                    study.title = self.config.default_title.clone();
                }
                study.normalize();
                Ok(Outcome::Study {
                    study,
                    stats: RunStats::single(strategy, fragment.salvaged),
                })
            }
        }
    }

    /// Segment, extract the header, then run every segment in batches
    async fn run_segmented(
        &self,
        request: &ExtractionRequest,
        selector: &StrategySelector,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ExtractorError> {
        let segmentation = self.segmenter.segment(&request.text);

        if selector.after_segmentation(&segmentation) == Strategy::ConciseSingle {
            info!("No lesson headers found, using concise single call");
            let capped = selector.cap_text(&request.text);
            return self
                .run_single(capped, Strategy::ConciseSingle, request, cancel)
                .await;
        }

        let segments = segmentation.segments;
        info!(
            "Split document into {} segments on '{}' headers",
            segments.len(),
            segmentation.pattern.unwrap_or("unknown")
        );

        let header_extractor = HeaderExtractor::new(self.oracle.as_ref(), &self.config);
        let header = cancellable(cancel, async {
            Ok::<_, ExtractorError>(header_extractor.extract(&request.text).await)
        })
        .await?;

        let extractor = SegmentExtractor::new(self.oracle.as_ref(), &self.config);
        let transcript = request.transcript();
        let batcher = ConcurrencyBatcher::new(self.config.batch_size);

        let slots = batcher
            .run(&segments, cancel, |segment| {
                let extractor = &extractor;
                async move {
                    match extractor.extract_lesson(segment, transcript).await {
                        Ok(fragment) => Some(fragment),
                        Err(e) => {
                            warn!("Segment {} dropped: {}", segment.index, e);
                            None
                        }
                    }
                }
            })
            .await?;

        let results = segments.iter().map(|s| s.index).zip(slots).collect();
        let assembly = ResultAssembler::new(header).assemble(results)?;

        Ok(Outcome::Study {
            stats: RunStats {
                strategy: Strategy::Segmented,
                segments_total: segments.len(),
                segments_dropped: assembly.dropped,
                segments_salvaged: assembly.salvaged,
            },
            study: assembly.study,
        })
    }
}

async fn cancellable<T, F>(cancel: &CancellationToken, work: F) -> Result<T, ExtractorError>
where
    F: Future<Output = Result<T, ExtractorError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExtractorError::Cancelled),
        result = work => result,
    }
}
