//! Engine plumbing: builder validation, custom handlers, streaming and
//! concurrent runs.

use async_trait::async_trait;
use carfinder::providers::{
    MockClassifier, MockImageSearch, MockPlateRecognizer, MockRegistry, Providers,
};
use carfinder::states::LoopState;
use carfinder::{
    Classification, Event, FinderBuilder, FinderConfig, FinderError, ImageResult,
    ImageSearchProvider, LoopOutput, ProviderError, SearchState, State, VisionClassifier,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

fn builder_with_mocks(links: &[&str], verdicts: &[bool]) -> FinderBuilder {
    FinderBuilder::new()
        .image_search(Arc::new(MockImageSearch::links(links)))
        .classifier(Arc::new(MockClassifier::verdicts(verdicts)))
        .registry(Arc::new(MockRegistry::not_found()))
        .plate_recognizer(Arc::new(MockPlateRecognizer::blind()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_builder_requires_every_provider() {
    let err = FinderBuilder::new()
        .image_search(Arc::new(MockImageSearch::empty()))
        .classifier(Arc::new(MockClassifier::always_miss()))
        .registry(Arc::new(MockRegistry::not_found()))
        .build()
        .err()
        .expect("plate recognizer is missing");
    assert!(matches!(err, FinderError::BuildError(ref msg) if msg.contains("plate recognizer")));

    assert!(FinderBuilder::new().build().is_err());
}

#[test]
fn test_builder_rejects_zero_limits() {
    let err = builder_with_mocks(&[], &[]).attempt_limit(0).build().err().unwrap();
    assert!(matches!(err, FinderError::BuildError(_)));

    let err = builder_with_mocks(&[], &[])
        .call_timeout(std::time::Duration::ZERO)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, FinderError::BuildError(_)));
}

#[test]
fn test_builder_applies_config() {
    let engine = builder_with_mocks(&[], &[])
        .config(FinderConfig { attempt_limit: 4, ..FinderConfig::default() })
        .max_plate_checks(2)
        .build()
        .unwrap();
    assert_eq!(engine.config().attempt_limit, 4);
    assert_eq!(engine.config().max_plate_checks, 2);
    assert_eq!(engine.config().call_timeout, std::time::Duration::from_secs(10));
}

// ─────────────────────────────────────────────────────────────────────────────
// Custom handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Emits an event the transition table does not know.
struct RogueGenerate;

#[async_trait]
impl LoopState for RogueGenerate {
    fn name(&self) -> &'static str { "Generate" }

    async fn handle(
        &self,
        state:      SearchState,
        _providers: &Providers,
        _config:    &FinderConfig,
        _output_tx: Option<&UnboundedSender<LoopOutput>>,
    ) -> (SearchState, Event) {
        (state.logged("Generate", "ROGUE", ""), Event::new("Teleport"))
    }
}

#[tokio::test]
async fn test_unknown_event_is_an_invalid_transition() {
    let mut handlers: HashMap<String, Box<dyn LoopState>> = HashMap::new();
    handlers.insert("Generate".to_string(), Box::new(RogueGenerate));

    let engine = builder_with_mocks(&["A"], &[true])
        .build_with_handlers(handlers)
        .unwrap();

    let err = engine.run("Porsche 718", "").await.unwrap_err();
    match err {
        FinderError::InvalidTransition { from, event } => {
            assert_eq!(from, State::generate());
            assert_eq!(event, Event::new("Teleport"));
        }
        other => panic!("expected InvalidTransition, got {:?}", other),
    }
}

#[tokio::test]
async fn test_step_runs_a_single_handler() {
    let engine = builder_with_mocks(&["A", "B"], &[false]).build().unwrap();

    let search = SearchState::new("Porsche 718", "");
    let (next, search) = engine.step(&State::generate(), search, None).await.unwrap();
    assert_eq!(next, State::reflect());
    assert_eq!(search.attempt, 1);
    assert_eq!(search.current_candidate.as_ref().map(|c| c.link.as_str()), Some("A"));

    let (next, search) = engine.step(&next, search, None).await.unwrap();
    assert_eq!(next, State::generate());
    assert_eq!(search.image_index, 1);
    assert!(!search.matched);
}

#[tokio::test]
async fn test_step_on_terminal_state_has_no_handler() {
    let engine = builder_with_mocks(&[], &[]).build().unwrap();

    let err = engine.step(&State::done(), SearchState::new("x", ""), None).await.unwrap_err();
    assert!(matches!(err, FinderError::NoHandlerForState(ref s) if s == "Done"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_run_streaming_reports_progress_and_finishes() {
    let engine = builder_with_mocks(&["A", "B"], &[false, true]).build().unwrap();

    let outputs: Vec<LoopOutput> = engine.run_streaming("Porsche 718", "").collect().await;

    let started = outputs.iter().filter(|o| matches!(o, LoopOutput::StateStarted(_))).count();
    assert_eq!(started, 4, "two attempts, two states each");

    assert!(matches!(
        outputs.first(),
        Some(LoopOutput::StateStarted(s)) if *s == State::generate()
    ));
    assert!(outputs.iter().any(|o| matches!(
        o,
        LoopOutput::QueryBuilt { attempt: 1, query } if query == "Porsche 718"
    )));
    assert!(outputs.iter().any(|o| matches!(
        o,
        LoopOutput::Classified { attempt: 2, is_match: true, .. }
    )));

    match outputs.last() {
        Some(LoopOutput::Finished(outcome)) => {
            assert!(outcome.matched);
            assert_eq!(outcome.attempts, 2);
            assert_eq!(outcome.image_url, "B");
        }
        other => panic!("expected Finished last, got {:?}", other),
    }
}

#[tokio::test]
async fn test_run_streaming_reports_engine_errors() {
    let engine = builder_with_mocks(&["A"], &[true]).build().unwrap();

    let outputs: Vec<LoopOutput> = engine.run_streaming("  ", "").collect().await;

    assert_eq!(outputs.len(), 1);
    assert!(matches!(&outputs[0], LoopOutput::Error(msg) if msg.contains("empty")));
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

/// Offers `<query>/wrong` then `<query>/right`.
struct PerQuerySearch;

#[async_trait]
impl ImageSearchProvider for PerQuerySearch {
    async fn search(&self, query: &str) -> Result<Vec<ImageResult>, ProviderError> {
        tokio::task::yield_now().await;
        Ok(vec![
            ImageResult::new(format!("{}/wrong", query), ""),
            ImageResult::new(format!("{}/right", query), ""),
        ])
    }
}

/// Matches only the `right` image belonging to the expected description.
struct PathClassifier;

#[async_trait]
impl VisionClassifier for PathClassifier {
    async fn classify(&self, image_url: &str, expected: &str) -> Result<Classification, ProviderError> {
        tokio::task::yield_now().await;
        if image_url == format!("{}/right", expected) {
            Ok(Classification::matched(expected))
        } else {
            Ok(Classification::miss("something else"))
        }
    }
}

#[tokio::test]
async fn test_concurrent_runs_do_not_share_state() {
    let engine = Arc::new(
        FinderBuilder::new()
            .image_search(Arc::new(PerQuerySearch))
            .classifier(Arc::new(PathClassifier))
            .registry(Arc::new(MockRegistry::not_found()))
            .plate_recognizer(Arc::new(MockPlateRecognizer::blind()))
            .build()
            .unwrap(),
    );

    let (a, b) = tokio::join!(
        engine.run("Porsche 718", ""),
        engine.run("Volvo 240", ""),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.image_url, "Porsche 718/right");
    assert_eq!(a.detected_car_type, "Porsche 718");
    assert_eq!(a.attempts, 2);
    assert_eq!(b.image_url, "Volvo 240/right");
    assert_eq!(b.detected_car_type, "Volvo 240");
    assert_eq!(b.attempts, 2);
}
