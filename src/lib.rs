pub mod types;
pub mod events;
pub mod transitions;
pub mod trace;
pub mod error;
pub mod plate;
pub mod query;
pub mod search_state;
pub mod states;
pub mod engine;
pub mod builder;
pub mod providers;
pub mod config;
pub mod server;

// Convenience re-exports at crate root
pub use builder::FinderBuilder;
pub use engine::FinderEngine;
pub use search_state::SearchState;
pub use types::{State, ImageResult, Classification, RegistryInfo, SearchOutcome, FinderConfig, LoopOutput};
pub use events::Event;
pub use providers::{ImageSearchProvider, VisionClassifier, RegistryLookup, PlateRecognizer};
pub use trace::{TraceEntry, Trace};
pub use error::{FinderError, ProviderError, ConfigError};
