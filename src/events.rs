use serde::{Deserialize, Serialize};

/// A named event emitted by a state handler to drive transitions.
///
/// ```
/// use carfinder::Event;
/// assert_eq!(Event::found().as_str(), "Found");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event(pub String);

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Generate outcome
    pub fn candidate_selected() -> Self { Self::new("CandidateSelected") }

    // Reflect outcomes
    pub fn found()     -> Self { Self::new("Found") }
    pub fn retry()     -> Self { Self::new("Retry") }
    pub fn exhausted() -> Self { Self::new("Exhausted") }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
