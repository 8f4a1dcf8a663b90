//! Merge per-segment weeks into one study

use crate::error::ExtractorError;
use crate::header::StudyHeader;
use crate::invoke::Fragment;
use lectio_domain::{ParsedStudy, ParsedWeek};
use tracing::{info, warn};

/// An assembled study and what was lost or repaired along the way
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    /// The merged, renumbered study
    pub study: ParsedStudy,
    /// Segments with no usable result
    pub dropped: usize,
    /// Segments recovered from truncated output
    pub salvaged: usize,
}

/// Merges segment results with the header metadata
pub struct ResultAssembler {
    header: StudyHeader,
}

impl ResultAssembler {
    /// Create an assembler for one document
    pub fn new(header: StudyHeader) -> Self {
        Self { header }
    }

    /// Build the study from `(segment index, result)` pairs
    ///
    /// Failed segments are discarded, survivors are ordered by segment index,
    /// and weeks, days and questions are renumbered 1..N. With no survivors
    /// the whole run fails.
    pub fn assemble(
        self,
        results: Vec<(usize, Option<Fragment<ParsedWeek>>)>,
    ) -> Result<Assembly, ExtractorError> {
        let total = results.len();
        let mut survivors: Vec<(usize, Fragment<ParsedWeek>)> = results
            .into_iter()
            .filter_map(|(index, result)| result.map(|fragment| (index, fragment)))
            .collect();

        if survivors.is_empty() {
            return Err(ExtractorError::AllSegmentsFailed(total));
        }
        survivors.sort_by_key(|(index, _)| *index);

        let dropped = total - survivors.len();
        if dropped > 0 {
            warn!("Dropped {} of {} segments", dropped, total);
        }
        let salvaged = survivors.iter().filter(|(_, f)| f.salvaged).count();

        let mut study = ParsedStudy::new(self.header.title);
        study.description = self.header.description;
        study.author = self.header.author;
        study.weeks = survivors.into_iter().map(|(_, f)| f.value).collect();
        study.normalize();

        info!(
            "Assembled study '{}': {} weeks, {} days, {} questions",
            study.title,
            study.weeks.len(),
            study.total_days(),
            study.total_questions()
        );

        Ok(Assembly {
            study,
            dropped,
            salvaged,
        })
    }
}
