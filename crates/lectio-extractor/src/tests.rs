//! Integration tests for the Extractor

#[cfg(test)]
mod tests {
    use crate::{
        char_len, ClarificationRequest, ExtractionRequest, ExtractionResult, Extractor,
        ExtractorConfig, ExtractorError, Fidelity, Strategy,
    };
    use async_trait::async_trait;
    use lectio_domain::{Oracle, OracleRequest, OracleResponse};
    use lectio_llm::{LlmError, MockOracle, MockReply};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;

    const HEADER_NEEDLE: &str = "study metadata";
    const FULL_NEEDLE: &str = "including sub-parts";
    const FILLER: &str = "Read the passage slowly and reflect on what it reveals. ";

    fn header_json(title: &str) -> String {
        json!({"title": title, "description": "A guided study", "author": null}).to_string()
    }

    /// A single-lesson reply with deliberately wrong numbering
    fn lesson_json(title: &str, days: usize, questions: usize) -> String {
        let days: Vec<_> = (0..days)
            .map(|d| {
                let questions: Vec<_> = (0..questions)
                    .map(|q| json!({"questionText": format!("{} day {} question {}?", title, d + 1, q + 1), "order": 42}))
                    .collect();
                json!({"dayNumber": 9, "title": format!("Day {}", d + 1), "questions": questions})
            })
            .collect();
        json!({"weekNumber": 7, "title": title, "days": days}).to_string()
    }

    fn study_json(title: &str) -> String {
        json!({
            "title": title,
            "weeks": [{"title": "Only week", "days": [{"title": "Day 1", "questions": [{"questionText": "Why?"}]}]}]
        })
        .to_string()
    }

    /// Document with `lessons` sections headed "{keyword} N: ..." and a marker per section
    fn sectioned_document(keyword: &str, lessons: usize) -> String {
        let mut doc = String::from("An introduction to the study.\n\n");
        for n in 1..=lessons {
            doc.push_str(&format!("{} {}: Section title\n", keyword, n));
            doc.push_str(&format!("marker-{}\n", n));
            doc.push_str(&FILLER.repeat(4));
            doc.push('\n');
        }
        doc
    }

    fn small_threshold_config() -> ExtractorConfig {
        ExtractorConfig {
            large_document_threshold: 200,
            concise_char_cap: 400,
            ..ExtractorConfig::default()
        }
    }

    fn expect_success(result: ExtractionResult) -> crate::ExtractedStudy {
        match result {
            ExtractionResult::Success(extracted) => extracted,
            other => panic!("expected success, got {:?}", other),
        }
    }

    fn expect_clarification(result: ExtractionResult) -> ClarificationRequest {
        match result {
            ExtractionResult::NeedsClarification(request) => request,
            other => panic!("expected clarification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_large_document_end_to_end() {
        // Five weeks, five days each, three questions per day
        let mut doc = String::from("Walking With Ruth\nA five week study.\n\n");
        for w in 1..=5 {
            doc.push_str(&format!("Week {}: Chapter {} of Ruth\n", w, w));
            for d in 1..=5 {
                doc.push_str(&format!("Day {}: Reading\n", d));
                doc.push_str(&FILLER.repeat(38));
                doc.push('\n');
                for q in 1..=3 {
                    doc.push_str(&format!("{}. What stands out in this passage?\n", q));
                }
            }
        }
        let padding = 60_000 - char_len(&doc);
        doc.push_str(&".".repeat(padding));
        assert_eq!(char_len(&doc), 60_000);

        let oracle = MockOracle::new(lesson_json("Lesson", 5, 3));
        oracle.add_system_response(HEADER_NEEDLE, MockReply::completed(header_json("Walking With Ruth")));
        let extractor = Extractor::new(oracle.clone(), ExtractorConfig::default());

        let extracted = expect_success(extractor.extract(ExtractionRequest::new(doc)).await);
        let study = &extracted.study;

        assert_eq!(study.title, "Walking With Ruth");
        assert_eq!(study.weeks.len(), 5);
        assert_eq!(study.total_days(), 25);
        assert_eq!(study.total_questions(), 75);
        assert_eq!(extracted.fidelity, Fidelity::Exact);
        assert_eq!(extracted.metadata.strategy, Strategy::Segmented);
        assert_eq!(extracted.metadata.segments_total, 5);
        assert_eq!(extracted.metadata.segments_dropped, 0);

        for (w, week) in study.weeks.iter().enumerate() {
            assert_eq!(week.week_number as usize, w + 1);
            for (d, day) in week.days.iter().enumerate() {
                assert_eq!(day.day_number as usize, d + 1);
                let orders: Vec<u32> = day.questions.iter().map(|q| q.order).collect();
                assert_eq!(orders, vec![1, 2, 3]);
            }
        }

        // One header call plus one call per week
        assert_eq!(oracle.call_count(), 6);
    }

    #[tokio::test]
    async fn test_week_order_survives_latency() {
        let doc = sectioned_document("Lesson", 6);
        let oracle = MockOracle::new(lesson_json("unused", 1, 1));
        oracle.add_system_response(HEADER_NEEDLE, MockReply::completed(header_json("Ordered")));
        for n in 1..=6u64 {
            // Earlier segments answer last
            let reply = MockReply::completed(lesson_json(&format!("Lesson {}", n), 1, 1))
                .with_delay(Duration::from_millis(70 - n * 10));
            oracle.add_response(format!("marker-{}\n", n), reply);
        }

        let extractor = Extractor::new(oracle, small_threshold_config());
        let extracted = expect_success(extractor.extract(ExtractionRequest::new(doc)).await);

        let titles: Vec<&str> = extracted.study.weeks.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Lesson 1", "Lesson 2", "Lesson 3", "Lesson 4", "Lesson 5", "Lesson 6"]
        );
        let numbers: Vec<u32> = extracted.study.weeks.iter().map(|w| w.week_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    }

    /// Oracle that records how many calls overlap
    struct CountingOracle {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        reply: String,
    }

    #[async_trait]
    impl Oracle for CountingOracle {
        type Error = LlmError;

        async fn generate(&self, _request: OracleRequest) -> Result<OracleResponse, Self::Error> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(15)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(OracleResponse::completed(self.reply.clone()))
        }
    }

    #[tokio::test]
    async fn test_peak_concurrency_is_batch_size() {
        let oracle = Arc::new(CountingOracle {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            reply: lesson_json("Week", 1, 1),
        });
        let extractor = Extractor::from_arc(Arc::clone(&oracle), small_threshold_config());

        let extracted = expect_success(
            extractor
                .extract(ExtractionRequest::new(sectioned_document("Week", 7)))
                .await,
        );

        assert_eq!(extracted.study.weeks.len(), 7);
        assert_eq!(oracle.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unsegmentable_document_uses_concise_call() {
        let mut doc = FILLER.repeat(1_800);
        doc.push_str("TAIL-MARKER");
        assert!(char_len(&doc) > 80_000);

        let oracle = MockOracle::new(study_json("Concise"));
        let extractor = Extractor::new(oracle.clone(), ExtractorConfig::default());
        let extracted = expect_success(extractor.extract(ExtractionRequest::new(doc)).await);

        assert_eq!(extracted.metadata.strategy, Strategy::ConciseSingle);
        assert_eq!(oracle.call_count(), 1);

        let request = &oracle.requests()[0];
        assert!(request.system.contains("at most 100 characters"));
        assert!(!request.user.contains("TAIL-MARKER"));
        assert_eq!(request.max_output_tokens, ExtractorConfig::default().concise_max_tokens);
    }

    #[tokio::test]
    async fn test_clarification_round_trip() {
        let clarify = json!({
            "needsClarification": true,
            "questions": [{"id": "q1", "question": "Is the preface a week?", "context": "It has questions", "options": ["A", "B"]}]
        })
        .to_string();

        let oracle = MockOracle::new(clarify);
        oracle.add_response("A: A", MockReply::completed(study_json("Clarified")));
        let extractor = Extractor::new(oracle.clone(), ExtractorConfig::default());

        let first = expect_clarification(extractor.extract(ExtractionRequest::new("Some study text")).await);
        assert_eq!(first.round, 1);
        assert_eq!(first.raw_text, "Some study text");
        assert_eq!(first.questions[0].options, Some(vec!["A".to_string(), "B".to_string()]));

        let answers: HashMap<String, String> = [("q1".to_string(), "A".to_string())].into();
        let extracted = expect_success(extractor.extract(first.answer(&answers)).await);
        assert_eq!(extracted.study.title, "Clarified");

        let resumed_prompt = &oracle.requests()[1].user;
        assert!(resumed_prompt.contains("Q: Is the preface a week?\nA: A"));

        // The raw (text, questions, answers) form behaves the same
        let request = ExtractionRequest::resume("Some study text", &first.questions, &answers);
        assert!(extractor.extract(request).await.is_success());
    }

    #[tokio::test]
    async fn test_answered_question_is_not_asked_again() {
        let clarify = json!({
            "needsClarification": true,
            "questions": [{"id": "q1", "question": "Is the preface a week?"}]
        })
        .to_string();
        let oracle = MockOracle::new(clarify);
        let extractor = Extractor::new(oracle, ExtractorConfig::default());

        let first = expect_clarification(extractor.extract(ExtractionRequest::new("doc")).await);
        let answers: HashMap<String, String> = [("q1".to_string(), "No".to_string())].into();

        let result = extractor.extract(first.answer(&answers)).await;
        assert!(matches!(
            result,
            ExtractionResult::Failure(ExtractorError::ClarificationLimitExceeded(_))
        ));
    }

    #[tokio::test]
    async fn test_clarification_rounds_are_bounded() {
        let oracle = MockOracle::new(study_json("never reached"));
        for n in 1..=4 {
            oracle.push_reply(MockReply::completed(
                json!({
                    "needsClarification": true,
                    "questions": [{"id": "q1", "question": format!("Question number {}?", n)}]
                })
                .to_string(),
            ));
        }
        let extractor = Extractor::new(oracle, ExtractorConfig::default());
        let answers: HashMap<String, String> = [("q1".to_string(), "yes".to_string())].into();

        let mut request = ExtractionRequest::new("doc");
        for round in 1..=3 {
            let clarification = expect_clarification(extractor.extract(request).await);
            assert_eq!(clarification.round, round);
            request = clarification.answer(&answers);
        }
        assert_eq!(request.history.len(), 3);

        let result = extractor.extract(request).await;
        assert_eq!(
            result,
            ExtractionResult::Failure(ExtractorError::ClarificationLimitExceeded(3))
        );
        let message = result.to_response()["error"].as_str().unwrap_or_default().to_string();
        assert!(message.contains("too ambiguous"));
    }

    #[tokio::test]
    async fn test_truncated_full_call_falls_back_to_segments() {
        let doc = sectioned_document("Week", 3);
        assert!(char_len(&doc) < ExtractorConfig::default().large_document_threshold);

        let oracle = MockOracle::new(lesson_json("Week", 2, 2));
        oracle.add_system_response(HEADER_NEEDLE, MockReply::completed(header_json("Fallback")));
        oracle.add_system_response(FULL_NEEDLE, MockReply::truncated(r#"{"title": "Fallb"#));
        let extractor = Extractor::new(oracle.clone(), ExtractorConfig::default());

        let extracted = expect_success(extractor.extract(ExtractionRequest::new(doc)).await);
        assert_eq!(extracted.metadata.strategy, Strategy::Segmented);
        assert_eq!(extracted.study.title, "Fallback");
        assert_eq!(extracted.study.weeks.len(), 3);
        // Full call, header call, three lessons
        assert_eq!(oracle.call_count(), 5);
    }

    #[tokio::test]
    async fn test_truncated_full_reply_keeps_only_complete_weeks() {
        let truncated = concat!(
            r#"{"title": "Ruth", "weeks": [{"title": "Loss", "days": ["#,
            r#"{"title": "Famine", "questions": [{"questionText": "Why Moab?"}]}]}, "#,
            r#"{"title": "Loy"#
        );
        let oracle = MockOracle::with_default(MockReply::truncated(truncated));
        let extractor = Extractor::new(oracle, ExtractorConfig::default());

        let extracted = expect_success(extractor.extract(ExtractionRequest::new("Ruth study")).await);
        assert_eq!(extracted.fidelity, Fidelity::Salvaged);
        assert_eq!(extracted.study.weeks.len(), 1);
        assert_eq!(extracted.study.weeks[0].title, "Loss");
        assert!(extracted.study.weeks.iter().all(|w| !w.title.starts_with("Week ")));
    }

    #[tokio::test]
    async fn test_reply_cut_in_first_week_is_not_a_study() {
        let oracle = MockOracle::with_default(MockReply::truncated(r#"{"weeks":[{"ti"#));
        let extractor = Extractor::new(oracle, ExtractorConfig::default());

        // Full call, then the concise call for the unsegmentable text
        let result = extractor.extract(ExtractionRequest::new("Ruth study")).await;
        assert_eq!(result, ExtractionResult::Failure(ExtractorError::OutputTruncated));
    }

    #[tokio::test]
    async fn test_introduction_before_first_header_is_extracted() {
        let mut doc = format!("Getting started PREAMBLE-MARKER\n{}\n", FILLER.repeat(3));
        doc.push_str(&sectioned_document("Week", 2));

        let oracle = MockOracle::new(lesson_json("Week", 1, 1));
        oracle.add_system_response(HEADER_NEEDLE, MockReply::completed(header_json("Ruth")));
        oracle.add_response("PREAMBLE-MARKER", MockReply::completed(lesson_json("Getting started", 1, 2)));
        let extractor = Extractor::new(oracle.clone(), small_threshold_config());

        let extracted = expect_success(extractor.extract(ExtractionRequest::new(doc)).await);
        assert_eq!(extracted.metadata.segments_total, 3);
        assert_eq!(extracted.study.weeks.len(), 3);
        assert_eq!(extracted.study.weeks[0].title, "Getting started");
        assert_eq!(extracted.study.weeks[0].question_count(), 2);
        assert_eq!(extracted.study.weeks[0].week_number, 1);
    }

    #[tokio::test]
    async fn test_salvaged_segment_marks_fidelity() {
        let doc = sectioned_document("Session", 3);
        let oracle = MockOracle::new(lesson_json("Session", 1, 2));
        oracle.add_system_response(HEADER_NEEDLE, MockReply::completed(header_json("Salvage")));
        oracle.add_response(
            "marker-2\n",
            MockReply::truncated(
                r#"{"title": "Cut", "days": [{"title": "Day 1", "questions": [{"questionText": "Kept?"}]}, {"title": "Day 2", "questions": [{"questionT"#,
            ),
        );
        let extractor = Extractor::new(oracle, small_threshold_config());

        let extracted = expect_success(extractor.extract(ExtractionRequest::new(doc)).await);
        assert_eq!(extracted.fidelity, Fidelity::Salvaged);
        assert_eq!(extracted.metadata.segments_salvaged, 1);
        let cut = &extracted.study.weeks[1];
        assert_eq!(cut.title, "Cut");
        assert_eq!(cut.days[0].questions[0].question_text, "Kept?");
        assert!(cut.days[1].questions.is_empty());
    }

    #[tokio::test]
    async fn test_failed_segment_is_dropped() {
        let doc = sectioned_document("Chapter", 3);
        let oracle = MockOracle::new(lesson_json("Chapter", 1, 1));
        oracle.add_system_response(HEADER_NEEDLE, MockReply::completed(header_json("Dropped")));
        oracle.add_error("marker-2\n");
        let extractor = Extractor::new(oracle, small_threshold_config());

        let extracted = expect_success(extractor.extract(ExtractionRequest::new(doc)).await);
        assert_eq!(extracted.study.weeks.len(), 2);
        assert_eq!(extracted.metadata.segments_dropped, 1);
        let numbers: Vec<u32> = extracted.study.weeks.iter().map(|w| w.week_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_all_segments_failed() {
        let doc = sectioned_document("Unit", 3);
        let oracle = MockOracle::new("I'm not sure what this is.");
        oracle.add_system_response(HEADER_NEEDLE, MockReply::completed(header_json("Nothing")));
        let extractor = Extractor::new(oracle, small_threshold_config());

        let result = extractor.extract(ExtractionRequest::new(doc)).await;
        assert_eq!(result, ExtractionResult::Failure(ExtractorError::AllSegmentsFailed(3)));
        let response = result.to_response();
        assert!(response["error"]
            .as_str()
            .unwrap()
            .contains("Could not parse any lessons"));
    }

    #[tokio::test]
    async fn test_header_failure_is_not_fatal() {
        let doc = sectioned_document("Week", 2);
        let oracle = MockOracle::new(lesson_json("Week", 1, 1));
        oracle.add_system_response(HEADER_NEEDLE, MockReply::error());
        let extractor = Extractor::new(oracle, small_threshold_config());

        let extracted = expect_success(extractor.extract(ExtractionRequest::new(doc)).await);
        assert_eq!(extracted.study.title, "Untitled Study");
        assert_eq!(extracted.study.description, None);
        assert_eq!(extracted.study.weeks.len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_stops_in_flight_batch() {
        let doc = sectioned_document("Week", 6);
        let oracle = MockOracle::with_default(
            MockReply::completed(lesson_json("Week", 1, 1)).with_delay(Duration::from_secs(10)),
        );
        oracle.add_system_response(HEADER_NEEDLE, MockReply::completed(header_json("Slow")));
        let extractor = Extractor::new(oracle.clone(), small_threshold_config());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = extractor
            .extract_with_cancel(ExtractionRequest::new(doc), cancel)
            .await;

        assert_eq!(result, ExtractionResult::Failure(ExtractorError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        // Header call plus the first batch only
        assert_eq!(oracle.call_count(), 4);
    }
}
