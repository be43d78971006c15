use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use crate::engine::FinderEngine;
use crate::error::FinderError;
use crate::providers::{
    ImageSearchProvider, PlateRecognizer, Providers, RegistryLookup, VisionClassifier,
};
use crate::states::{GenerateState, LoopState, ReflectState};
use crate::transitions::build_transition_table;
use crate::types::FinderConfig;

/// Assembles a `FinderEngine` from its four collaborators.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use carfinder::FinderBuilder;
/// # use carfinder::providers::{GoogleImageSearch, OpenAiVision, RdwRegistry};
/// let vision = Arc::new(OpenAiVision::new("gpt-4o-mini"));
/// let engine = FinderBuilder::new()
///     .image_search(Arc::new(GoogleImageSearch::new(None, "cse-id")))
///     .classifier(vision.clone())
///     .plate_recognizer(vision)
///     .registry(Arc::new(RdwRegistry::new("https://opendata.rdw.nl/resource/m9d7-ebf2.json")))
///     .attempt_limit(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct FinderBuilder {
    search:     Option<Arc<dyn ImageSearchProvider>>,
    classifier: Option<Arc<dyn VisionClassifier>>,
    registry:   Option<Arc<dyn RegistryLookup>>,
    plates:     Option<Arc<dyn PlateRecognizer>>,
    config:     FinderConfig,
}

impl FinderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_search(mut self, search: Arc<dyn ImageSearchProvider>) -> Self {
        self.search = Some(search); self
    }

    pub fn classifier(mut self, classifier: Arc<dyn VisionClassifier>) -> Self {
        self.classifier = Some(classifier); self
    }

    pub fn registry(mut self, registry: Arc<dyn RegistryLookup>) -> Self {
        self.registry = Some(registry); self
    }

    pub fn plate_recognizer(mut self, plates: Arc<dyn PlateRecognizer>) -> Self {
        self.plates = Some(plates); self
    }

    pub fn config(mut self, config: FinderConfig) -> Self {
        self.config = config; self
    }

    pub fn attempt_limit(mut self, n: u32) -> Self {
        self.config.attempt_limit = n; self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout; self
    }

    pub fn max_plate_checks(mut self, n: u32) -> Self {
        self.config.max_plate_checks = n; self
    }

    fn default_handlers() -> HashMap<String, Box<dyn LoopState>> {
        let handlers: [Box<dyn LoopState>; 2] = [Box::new(GenerateState), Box::new(ReflectState)];
        handlers.into_iter()
            .map(|h| (h.name().to_string(), h))
            .collect()
    }

    fn providers(&mut self) -> Result<Providers, FinderError> {
        fn required<T: ?Sized>(slot: Option<Arc<T>>, what: &str) -> Result<Arc<T>, FinderError> {
            slot.ok_or_else(|| FinderError::BuildError(format!("{} is required", what)))
        }

        if self.config.attempt_limit == 0 {
            return Err(FinderError::BuildError("attempt_limit must be at least 1".to_string()));
        }
        if self.config.call_timeout.is_zero() {
            return Err(FinderError::BuildError("call_timeout must be non-zero".to_string()));
        }

        Ok(Providers {
            search:     required(self.search.take(), "image search provider")?,
            classifier: required(self.classifier.take(), "vision classifier")?,
            registry:   required(self.registry.take(), "registry lookup")?,
            plates:     required(self.plates.take(), "plate recognizer")?,
        })
    }

    /// Builds the engine with the default Generate and Reflect handlers.
    pub fn build(self) -> Result<FinderEngine, FinderError> {
        self.build_with_handlers(HashMap::new())
    }

    /// Builds with custom state handlers. Any entry in `extra_handlers`
    /// replaces the default handler registered under the same name.
    pub fn build_with_handlers(
        mut self,
        extra_handlers: HashMap<String, Box<dyn LoopState>>,
    ) -> Result<FinderEngine, FinderError> {
        let providers = self.providers()?;

        let mut handlers = Self::default_handlers();
        handlers.extend(extra_handlers);

        Ok(FinderEngine::new(
            providers,
            self.config,
            build_transition_table(),
            handlers,
        ))
    }
}
