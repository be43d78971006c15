use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::trace::Trace;

/// A named state in the search-verify state machine.
///
/// The loop ships with three states: `Generate` and `Reflect` are active,
/// `Done` is terminal. States are compared by name so the transition
/// table can be extended without touching this type.
///
/// ```
/// use carfinder::State;
/// assert!(State::done().is_terminal());
/// assert_eq!(State::generate().as_str(), "Generate");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State(pub String);

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_terminal(&self) -> bool {
        self.0 == "Done"
    }

    // ── Built-in states ─────────────────────────────────────────────────
    pub fn generate() -> Self { Self::new("Generate") }
    pub fn reflect()  -> Self { Self::new("Reflect") }
    pub fn done()     -> Self { Self::new("Done") }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One search hit, passed through from the image-search provider untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageResult {
    pub link:    String,
    #[serde(default)]
    pub snippet: String,
}

impl ImageResult {
    pub fn new(link: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self { link: link.into(), snippet: snippet.into() }
    }
}

/// Verdict of the vision classifier for one candidate image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub is_match:       bool,
    pub detected_label: String,
}

impl Classification {
    pub fn matched(label: impl Into<String>) -> Self {
        Self { is_match: true, detected_label: label.into() }
    }

    pub fn miss(label: impl Into<String>) -> Self {
        Self { is_match: false, detected_label: label.into() }
    }
}

/// Vehicle data returned by a registry lookup.
///
/// Registries differ in what they return: some identify the vehicle
/// (make + commercial name), some only describe it (year + color).
/// Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryInfo {
    pub found:           bool,
    pub make:            Option<String>,
    pub commercial_name: Option<String>,
    pub year:            Option<String>,
    pub color:           Option<String>,
}

impl RegistryInfo {
    pub fn not_found() -> Self {
        Self::default()
    }

    /// Query terms this record contributes, in query order.
    ///
    /// Identification wins over description: `[make, commercial_name]` when
    /// both are present, otherwise whichever of `[year, color]` are non-empty.
    pub fn enrichment(&self) -> Vec<&str> {
        if !self.found {
            return Vec::new();
        }
        fn present(f: &Option<String>) -> Option<&str> {
            f.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        if let (Some(make), Some(name)) = (present(&self.make), present(&self.commercial_name)) {
            return vec![make, name];
        }
        [present(&self.year), present(&self.color)]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Final result of one loop run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub matched:           bool,
    /// URL of the last candidate examined, empty if none was ever selected.
    pub image_url:         String,
    pub detected_car_type: String,
    pub attempts:          u32,
    pub plate_match:       Option<bool>,
    pub search_query:      String,
    #[serde(skip)]
    pub trace:             Trace,
}

/// Progress events emitted by `FinderEngine::run_streaming`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LoopOutput {
    /// The loop entered a new state
    StateStarted(State),
    /// A search query was built for this attempt
    QueryBuilt { attempt: u32, query: String },
    /// GENERATE picked a candidate (`None` when the list is exhausted)
    CandidateSelected { attempt: u32, index: usize, link: Option<String> },
    /// REFLECT received the classifier verdict
    Classified { attempt: u32, is_match: bool, label: String },
    /// The plate in the image was compared with the supplied plate
    PlateChecked { extracted: String, matches: bool },
    /// The run reached `Done`
    Finished(SearchOutcome),
    /// The engine itself failed (never a provider failure)
    Error(String),
}

/// Tunables for the search-verify loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderConfig {
    /// Hard cap on generate/reflect cycles
    pub attempt_limit: u32,

    /// Timeout applied to every individual provider call
    pub call_timeout: Duration,

    /// How many times a run may ask the plate recognizer
    pub max_plate_checks: u32,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            attempt_limit:    10,
            call_timeout:     Duration::from_secs(10),
            max_plate_checks: 1,
        }
    }
}
