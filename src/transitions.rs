use std::collections::HashMap;
use crate::types::State;
use crate::events::Event;

pub type TransitionTable = HashMap<(State, Event), State>;

/// Builds the generate/reflect transition table.
///
/// Any (State, Event) pair not in this table is illegal and makes
/// `FinderEngine::run()` return `FinderError::InvalidTransition`.
pub fn build_transition_table() -> TransitionTable {
    let mut t = HashMap::new();

    // ── GENERATE ─────────────────────────────────────────
    t.insert((State::generate(), Event::candidate_selected()), State::reflect());

    // ── REFLECT ──────────────────────────────────────────
    t.insert((State::reflect(),  Event::found()),              State::done());
    t.insert((State::reflect(),  Event::exhausted()),          State::done());
    t.insert((State::reflect(),  Event::retry()),              State::generate());

    // DONE is terminal: the engine exits before any lookup.

    t
}

pub fn is_valid_transition(table: &TransitionTable, state: &State, event: &Event) -> bool {
    table.contains_key(&(state.clone(), event.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_can_loop_back_or_finish() {
        let t = build_transition_table();
        assert_eq!(t.get(&(State::reflect(), Event::retry())), Some(&State::generate()));
        assert_eq!(t.get(&(State::reflect(), Event::found())), Some(&State::done()));
        assert_eq!(t.get(&(State::reflect(), Event::exhausted())), Some(&State::done()));
    }

    #[test]
    fn generate_cannot_finish_directly() {
        let t = build_transition_table();
        assert!(!is_valid_transition(&t, &State::generate(), &Event::found()));
        assert!(is_valid_transition(&t, &State::generate(), &Event::candidate_selected()));
    }
}
