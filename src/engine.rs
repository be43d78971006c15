use std::collections::HashMap;
use crate::states::LoopState;
use crate::events::Event;
use crate::providers::Providers;
use crate::search_state::SearchState;
use crate::transitions::TransitionTable;
use crate::types::{FinderConfig, LoopOutput, SearchOutcome, State};
use crate::error::FinderError;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::Instrument;
use uuid::Uuid;

/// Drives the generate/reflect loop.
///
/// An engine holds only immutable collaborators and configuration; every
/// call to `run` creates its own `SearchState`, so one engine can serve any
/// number of concurrent runs.
pub struct FinderEngine {
    providers:   Providers,
    config:      FinderConfig,
    transitions: TransitionTable,
    handlers:    HashMap<String, Box<dyn LoopState>>,
}

impl FinderEngine {
    /// Creates a new engine. Prefer using FinderBuilder for ergonomic construction.
    pub fn new(
        providers:   Providers,
        config:      FinderConfig,
        transitions: TransitionTable,
        handlers:    HashMap<String, Box<dyn LoopState>>,
    ) -> Self {
        Self { providers, config, transitions, handlers }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Runs one search to completion.
    ///
    /// Returns `Err(FinderError::EmptyQuery)` before any provider is called
    /// when `car_type` is blank. Provider failures never produce an `Err`.
    pub async fn run(&self, car_type: &str, license_plate: &str) -> Result<SearchOutcome, FinderError> {
        self.run_with_output(car_type, license_plate, None).await
    }

    async fn run_with_output(
        &self,
        car_type:      &str,
        license_plate: &str,
        output_tx:     Option<&UnboundedSender<LoopOutput>>,
    ) -> Result<SearchOutcome, FinderError> {
        let car_type = car_type.trim();
        if car_type.is_empty() {
            return Err(FinderError::EmptyQuery);
        }

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("find_car", %run_id, car_type, license_plate = license_plate.trim());

        async move {
            // Every attempt is exactly one Generate and one Reflect step.
            let safety_cap = self.config.attempt_limit as usize * 2 + 2;
            let mut iterations = 0;
            let mut current = State::generate();
            let mut search = SearchState::new(car_type, license_plate);

            while !current.is_terminal() {
                iterations += 1;
                if iterations > safety_cap {
                    return Err(FinderError::SafetyCapExceeded(iterations));
                }

                let (next, state) = self.step(&current, search, output_tx).await?;
                current = next;
                search = state;
            }

            let outcome = search.into_outcome();
            tracing::info!(
                matched  = outcome.matched,
                attempts = outcome.attempts,
                image    = %outcome.image_url,
                "search finished"
            );
            tracing::debug!(trace = %outcome.trace.to_json(), "run trace");

            if let Some(tx) = output_tx {
                let _ = tx.send(LoopOutput::Finished(outcome.clone()));
            }
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Executes a single state handler and the transition it selects.
    /// Returns the next state together with the updated search state.
    pub async fn step(
        &self,
        current:   &State,
        search:    SearchState,
        output_tx: Option<&UnboundedSender<LoopOutput>>,
    ) -> Result<(State, SearchState), FinderError> {
        tracing::debug!(state = %current, attempt = search.attempt, "loop step");

        let handler = self.handlers.get(current.as_str())
            .ok_or_else(|| FinderError::NoHandlerForState(current.to_string()))?;

        let (search, event): (SearchState, Event) =
            handler.handle(search, &self.providers, &self.config, output_tx).await;

        let next = self.transitions.get(&(current.clone(), event.clone()))
            .cloned()
            .ok_or_else(|| FinderError::InvalidTransition {
                from:  current.clone(),
                event: event.clone(),
            })?;

        tracing::info!(from = %current, event = %event, to = %next, attempt = search.attempt, "transition");
        Ok((next, search))
    }

    /// Runs one search and streams its progress.
    ///
    /// The stream ends after `LoopOutput::Finished` (or `LoopOutput::Error`
    /// when the engine itself fails).
    pub fn run_streaming<'a>(&'a self, car_type: &'a str, license_plate: &'a str) -> BoxStream<'a, LoopOutput> {
        let (tx, rx) = mpsc::unbounded_channel();

        let driver = stream::once(async move {
            if let Err(e) = self.run_with_output(car_type, license_plate, Some(&tx)).await {
                let _ = tx.send(LoopOutput::Error(e.to_string()));
            }
            // tx drops here, which ends the output stream once drained
        })
        .filter_map(|()| futures::future::ready(None::<LoopOutput>));

        let outputs = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        stream::select(driver, outputs).boxed()
    }
}
