use crate::events::Event;
use crate::providers::Providers;
use crate::search_state::SearchState;
use crate::types::{FinderConfig, LoopOutput};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

mod generate;
mod reflect;

pub use generate::GenerateState;
pub use reflect::{ReflectState, decide};

/// The contract every loop state must fulfill.
///
/// # Implementing a State
///
/// 1. `handle()` takes the run's `SearchState` by value and returns the
///    successor value together with the Event that drives the next
///    transition lookup.
/// 2. Provider failures are data, not errors: degrade them to the miss
///    outcome, record them with `SearchState::log()` and return the
///    ordinary Event.
/// 3. Every provider call goes through `providers::within()` with
///    `config.call_timeout`.
/// 4. Always log at least once per handle() call.
#[async_trait]
pub trait LoopState: Send + Sync {
    /// Must match the key used in the engine's handler map.
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        state:     SearchState,
        providers: &Providers,
        config:    &FinderConfig,
        output_tx: Option<&UnboundedSender<LoopOutput>>,
    ) -> (SearchState, Event);
}

pub(crate) fn emit(output_tx: Option<&UnboundedSender<LoopOutput>>, output: LoopOutput) {
    if let Some(tx) = output_tx {
        let _ = tx.send(output);
    }
}
