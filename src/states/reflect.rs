use crate::states::{emit, LoopState};
use crate::events::Event;
use crate::plate;
use crate::providers::{within, Providers};
use crate::search_state::{SearchState, IMAGE_UNUSABLE, NO_IMAGE_AVAILABLE};
use crate::types::{Classification, FinderConfig, ImageResult, LoopOutput, State};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// Classifies the candidate chosen by GENERATE and decides whether the run
/// continues.
pub struct ReflectState;

/// The continuation rule, evaluated after every REFLECT.
///
/// A match with a supplied plate only counts once the plate check passed.
/// Once the plate-check budget is spent on a mismatch no later candidate can
/// succeed, so the run stops right away. Otherwise the run stops when the
/// attempt ceiling is reached and loops back to GENERATE before that.
pub fn decide(state: &SearchState, config: &FinderConfig) -> Event {
    let plate_ok = !state.has_plate() || state.plate_match == Some(true);
    let plate_ruled_out = state.has_plate()
        && state.plate_checks >= config.max_plate_checks
        && state.plate_match == Some(false);

    if state.matched && plate_ok {
        Event::found()
    } else if plate_ruled_out || state.attempt >= config.attempt_limit {
        Event::exhausted()
    } else {
        Event::retry()
    }
}

impl ReflectState {
    async fn classify(
        &self,
        state:     &mut SearchState,
        candidate: &ImageResult,
        providers: &Providers,
        config:    &FinderConfig,
    ) -> Classification {
        let verdict = within(
            "classification",
            config.call_timeout,
            providers.classifier.classify(&candidate.link, &state.raw_query),
        ).await;

        match verdict {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(image_url = %candidate.link, error = %e, "classification failed");
                state.log("Reflect", "CLASSIFY_FAILED", &e.to_string());
                Classification::miss(IMAGE_UNUSABLE)
            }
        }
    }

    /// Reads the plate from the candidate and compares it with the supplied
    /// one. Returns `None` when the run has no plate checks left.
    async fn check_plate(
        &self,
        state:     &mut SearchState,
        candidate: &ImageResult,
        providers: &Providers,
        config:    &FinderConfig,
        output_tx: Option<&UnboundedSender<LoopOutput>>,
    ) -> Option<bool> {
        if state.plate_checks >= config.max_plate_checks {
            state.log("Reflect", "PLATE_CHECKS_SPENT", &format!("checks={}", state.plate_checks));
            return None;
        }
        state.plate_checks += 1;

        let extracted = match within("plate recognition", config.call_timeout, providers.plates.extract(&candidate.link)).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(image_url = %candidate.link, error = %e, "plate recognition failed");
                String::new()
            }
        };

        let matches = plate::plates_match(&state.license_plate, &extracted);
        emit(output_tx, LoopOutput::PlateChecked { extracted: extracted.clone(), matches });

        if matches {
            state.log("Reflect", "PLATE_MATCH", &extracted);
        } else {
            tracing::info!(supplied = %state.license_plate, extracted = %extracted, "license plate mismatch, continuing search");
            state.log("Reflect", "PLATE_MISMATCH", &format!(
                "supplied='{}' extracted='{}'", state.license_plate, extracted
            ));
        }
        Some(matches)
    }
}

#[async_trait]
impl LoopState for ReflectState {
    fn name(&self) -> &'static str { "Reflect" }

    async fn handle(
        &self,
        state:     SearchState,
        providers: &Providers,
        config:    &FinderConfig,
        output_tx: Option<&UnboundedSender<LoopOutput>>,
    ) -> (SearchState, Event) {
        emit(output_tx, LoopOutput::StateStarted(State::reflect()));

        let mut state = state;
        let Some(candidate) = state.current_candidate.take() else {
            let next = SearchState {
                matched:           false,
                detected_car_type: NO_IMAGE_AVAILABLE.to_string(),
                ..state
            }.logged("Reflect", "NO_IMAGE", "skipping classification");

            emit(output_tx, LoopOutput::Classified {
                attempt:  next.attempt,
                is_match: false,
                label:    NO_IMAGE_AVAILABLE.to_string(),
            });
            let event = decide(&next, config);
            return (next, event);
        };

        let verdict = self.classify(&mut state, &candidate, providers, config).await;
        emit(output_tx, LoopOutput::Classified {
            attempt:  state.attempt,
            is_match: verdict.is_match,
            label:    verdict.detected_label.clone(),
        });
        state.log("Reflect", if verdict.is_match { "CLASSIFIED_MATCH" } else { "CLASSIFIED_MISS" }, &format!(
            "{} -> '{}'", candidate.link, verdict.detected_label
        ));

        let mut plate_match = state.plate_match;
        let accepted = if verdict.is_match && state.has_plate() {
            match self.check_plate(&mut state, &candidate, providers, config, output_tx).await {
                Some(ok) => {
                    plate_match = Some(ok);
                    ok
                }
                None => false,
            }
        } else {
            verdict.is_match
        };

        // A miss moves the cursor so the next GENERATE offers the next image.
        let image_index = if accepted { state.image_index } else { state.image_index + 1 };

        let next = SearchState {
            matched:           accepted,
            detected_car_type: verdict.detected_label,
            plate_match,
            image_index,
            ..state
        };

        let event = decide(&next, config);
        (next.logged("Reflect", "DECISION", &event.to_string()), event)
    }
}
