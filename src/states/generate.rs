use crate::states::{emit, LoopState};
use crate::events::Event;
use crate::plate;
use crate::providers::{within, Providers};
use crate::query;
use crate::search_state::SearchState;
use crate::types::{FinderConfig, LoopOutput, RegistryInfo, State};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// Builds the query, makes sure candidates exist for it and selects the
/// candidate at the cursor.
pub struct GenerateState;

impl GenerateState {
    /// Runs the registry lookup the first time through, and only for a plate
    /// that passes the format check.
    async fn enrich(&self, state: SearchState, providers: &Providers, config: &FinderConfig) -> SearchState {
        if state.registry_checked || !plate::looks_like_plate(&state.license_plate) {
            return state;
        }

        let lookup = within("registry lookup", config.call_timeout, providers.registry.lookup(&state.license_plate)).await;
        let (registry, event, data): (Option<RegistryInfo>, &str, String) = match lookup {
            Ok(info) if info.found => {
                let data = format!("enrichment={:?}", info.enrichment());
                (Some(info), "REGISTRY_FOUND", data)
            }
            Ok(info) => (Some(info), "REGISTRY_EMPTY", format!("plate={}", state.license_plate)),
            Err(e) => {
                tracing::warn!(plate = %state.license_plate, error = %e, "registry lookup failed");
                (None, "REGISTRY_FAILED", e.to_string())
            }
        };

        SearchState { registry, registry_checked: true, ..state }
            .logged("Generate", event, &data)
    }

    /// Fetches candidates unless the cached list already belongs to `query`.
    /// Returns the state and whether a usable candidate list exists.
    async fn ensure_candidates(
        &self,
        state:     SearchState,
        query:     &str,
        providers: &Providers,
        config:    &FinderConfig,
    ) -> (SearchState, bool) {
        if state.candidates_query.as_deref() == Some(query) {
            return (state, true);
        }

        match within("image search", config.call_timeout, providers.search.search(query)).await {
            Ok(images) => {
                let images: Vec<_> = images.into_iter()
                    .filter(|img| !img.link.trim().is_empty())
                    .collect();
                let data = format!("query='{}' results={}", query, images.len());
                let next = SearchState {
                    candidate_images: images,
                    candidates_query: Some(query.to_string()),
                    image_index:      0,
                    ..state
                };
                (next.logged("Generate", "CANDIDATES_FETCHED", &data), true)
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "image search failed");
                (state.logged("Generate", "SEARCH_FAILED", &e.to_string()), false)
            }
        }
    }
}

#[async_trait]
impl LoopState for GenerateState {
    fn name(&self) -> &'static str { "Generate" }

    async fn handle(
        &self,
        state:     SearchState,
        providers: &Providers,
        config:    &FinderConfig,
        output_tx: Option<&UnboundedSender<LoopOutput>>,
    ) -> (SearchState, Event) {
        emit(output_tx, LoopOutput::StateStarted(State::generate()));

        let attempt = state.attempt + 1;
        let state = SearchState { attempt, ..state };
        let state = self.enrich(state, providers, config).await;

        let query = query::build(&state.raw_query, &state.license_plate, state.registry.as_ref());
        emit(output_tx, LoopOutput::QueryBuilt { attempt, query: query.clone() });

        let (state, have_candidates) = self.ensure_candidates(state, &query, providers, config).await;

        let candidate = if have_candidates {
            state.candidate_images.get(state.image_index).cloned()
        } else {
            None
        };

        emit(output_tx, LoopOutput::CandidateSelected {
            attempt,
            index: state.image_index,
            link:  candidate.as_ref().map(|c| c.link.clone()),
        });

        let (event, data) = match &candidate {
            Some(c) => ("CANDIDATE_SELECTED", format!("#{} {}", state.image_index + 1, c.link)),
            None    => ("NO_CANDIDATE", format!("index={} available={}", state.image_index, state.candidate_images.len())),
        };

        let last_image_url = candidate.as_ref()
            .map(|c| c.link.clone())
            .unwrap_or_else(|| state.last_image_url.clone());

        let next = SearchState {
            current_query:     query,
            current_candidate: candidate,
            last_image_url,
            ..state
        };

        (next.logged("Generate", event, &data), Event::candidate_selected())
    }
}
