use crate::plate;
use crate::trace::{Trace, TraceEntry};
use crate::types::{ImageResult, RegistryInfo, SearchOutcome};
use chrono::Utc;

/// Label reported when GENERATE had no candidate to offer.
pub const NO_IMAGE_AVAILABLE: &str = "no image available";
/// Label reported when the classifier could not use the candidate.
pub const IMAGE_UNUSABLE: &str = "image unusable";

/// Everything one loop run knows. Created per run, owned by that run,
/// handed from handler to handler by value and dropped when the run ends.
#[derive(Debug, Clone)]
pub struct SearchState {
    // ── Input ────────────────────────────────────────────
    /// Car description exactly as the caller supplied it (trimmed)
    pub raw_query:         String,
    /// Normalized plate, empty when none was supplied
    pub license_plate:     String,

    // ── Query ────────────────────────────────────────────
    /// Query used by the most recent GENERATE
    pub current_query:     String,
    /// Registry record, fetched at most once
    pub registry:          Option<RegistryInfo>,
    pub registry_checked:  bool,

    // ── Progress ─────────────────────────────────────────
    pub attempt:           u32,
    /// Cursor into `candidate_images`; advances only on a miss
    pub image_index:       usize,
    pub candidate_images:  Vec<ImageResult>,
    /// Query `candidate_images` was fetched for; `None` until a fetch succeeds
    pub candidates_query:  Option<String>,
    /// Set by GENERATE, consumed by REFLECT
    pub current_candidate: Option<ImageResult>,

    // ── Verdict ──────────────────────────────────────────
    pub last_image_url:    String,
    pub matched:           bool,
    pub detected_car_type: String,
    pub plate_match:       Option<bool>,
    pub plate_checks:      u32,

    pub trace:             Trace,
}

impl SearchState {
    pub fn new(raw_query: impl Into<String>, license_plate: &str) -> Self {
        let raw_query = raw_query.into().trim().to_string();
        Self {
            current_query:     raw_query.clone(),
            raw_query,
            license_plate:     plate::normalize(license_plate),
            registry:          None,
            registry_checked:  false,
            attempt:           0,
            image_index:       0,
            candidate_images:  Vec::new(),
            candidates_query:  None,
            current_candidate: None,
            last_image_url:    String::new(),
            matched:           false,
            detected_car_type: String::new(),
            plate_match:       None,
            plate_checks:      0,
            trace:             Trace::new(),
        }
    }

    pub fn has_plate(&self) -> bool {
        !self.license_plate.is_empty()
    }

    /// Records an event into the trace log. Called by all state handlers.
    pub fn log(&mut self, state: &str, event: &str, data: &str) {
        tracing::debug!(state, event, data, attempt = self.attempt, "search trace");
        self.trace.record(TraceEntry {
            attempt:   self.attempt,
            state:     state.to_string(),
            event:     event.to_string(),
            data:      data.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Same as `log`, but consumes and returns the state so it can sit at the
    /// end of a chain of updates.
    pub fn logged(mut self, state: &str, event: &str, data: &str) -> Self {
        self.log(state, event, data);
        self
    }

    pub fn into_outcome(self) -> SearchOutcome {
        SearchOutcome {
            matched:           self.matched,
            image_url:         self.last_image_url,
            detected_car_type: self.detected_car_type,
            attempts:          self.attempt,
            plate_match:       self.plate_match,
            search_query:      self.current_query,
            trace:             self.trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_normalizes_plate_once() {
        let s = SearchState::new(" Porsche 718 ", "ab-123-c");
        assert_eq!(s.raw_query, "Porsche 718");
        assert_eq!(s.current_query, "Porsche 718");
        assert_eq!(s.license_plate, "AB123C");
        assert!(s.has_plate());
        assert_eq!(s.attempt, 0);
        assert_eq!(s.image_index, 0);
        assert!(!s.matched);
        assert_eq!(s.plate_match, None);
    }

    #[test]
    fn outcome_carries_trace() {
        let s = SearchState::new("Mini", "").logged("Generate", "QUERY_BUILT", "Mini");
        assert!(!s.has_plate());
        let out = s.into_outcome();
        assert_eq!(out.trace.len(), 1);
        assert_eq!(out.image_url, "");
        assert_eq!(out.search_query, "Mini");
    }
}
