use std::sync::Mutex;
use std::time::Duration;
use crate::error::ProviderError;
use crate::providers::{ImageSearchProvider, PlateRecognizer, RegistryLookup, VisionClassifier};
use crate::types::{Classification, ImageResult, RegistryInfo};
use async_trait::async_trait;

/// Scripted image search. Programmed responses are served in order; once
/// they run out every call gets `fallback`.
pub struct MockImageSearch {
    responses: Mutex<Vec<Result<Vec<ImageResult>, ProviderError>>>,
    fallback:  Vec<ImageResult>,
    delay:     Option<Duration>,
    call_log:  Mutex<Vec<String>>,  // queries
}

impl MockImageSearch {
    /// Returns the same candidates on every call.
    pub fn returning(images: Vec<ImageResult>) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fallback:  images,
            delay:     None,
            call_log:  Mutex::new(Vec::new()),
        }
    }

    /// Candidates built from bare links, snippets left empty.
    pub fn links(links: &[&str]) -> Self {
        Self::returning(links.iter().map(|l| ImageResult::new(*l, "")).collect())
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    /// Serves `responses` in order, then empty result lists.
    pub fn scripted(responses: Vec<Result<Vec<ImageResult>, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            fallback:  Vec::new(),
            delay:     None,
            call_log:  Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    /// Sleeps before answering every search, for exercising call timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay); self
    }

    pub fn queries(&self) -> Vec<String> {
        self.call_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSearchProvider for MockImageSearch {
    async fn search(&self, query: &str) -> Result<Vec<ImageResult>, ProviderError> {
        self.call_log.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(self.fallback.clone());
        }
        responses.remove(0)
    }
}

/// Scripted classifier. Verdicts are served in call order; once they run
/// out every image is a miss labelled "not a car".
pub struct MockClassifier {
    responses: Mutex<Vec<Result<Classification, ProviderError>>>,
    delay:     Option<Duration>,
    call_log:  Mutex<Vec<(String, String)>>,  // (image_url, expected)
}

impl MockClassifier {
    pub fn new(responses: Vec<Result<Classification, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            delay:     None,
            call_log:  Mutex::new(Vec::new()),
        }
    }

    /// Shorthand: `true` is a match labelled "match", `false` a miss.
    pub fn verdicts(verdicts: &[bool]) -> Self {
        Self::new(verdicts.iter().map(|&hit| Ok(if hit {
            Classification::matched("match")
        } else {
            Classification::miss("not a car")
        })).collect())
    }

    pub fn always_miss() -> Self {
        Self::new(Vec::new())
    }

    /// Sleeps before answering, for exercising call timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay); self
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    pub fn image_for_call(&self, n: usize) -> Option<String> {
        self.call_log.lock().unwrap()
            .get(n)
            .map(|(url, _)| url.clone())
    }

    pub fn expected_for_call(&self, n: usize) -> Option<String> {
        self.call_log.lock().unwrap()
            .get(n)
            .map(|(_, expected)| expected.clone())
    }
}

#[async_trait]
impl VisionClassifier for MockClassifier {
    async fn classify(&self, image_url: &str, expected: &str) -> Result<Classification, ProviderError> {
        self.call_log.lock().unwrap()
            .push((image_url.to_string(), expected.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(Classification::miss("not a car"));
        }
        responses.remove(0)
    }
}

pub struct MockRegistry {
    response: Result<RegistryInfo, ProviderError>,
    delay:    Option<Duration>,
    call_log: Mutex<Vec<String>>,  // plates
}

impl MockRegistry {
    pub fn returning(info: RegistryInfo) -> Self {
        Self { response: Ok(info), delay: None, call_log: Mutex::new(Vec::new()) }
    }

    pub fn not_found() -> Self {
        Self::returning(RegistryInfo::not_found())
    }

    pub fn failing(err: ProviderError) -> Self {
        Self { response: Err(err), delay: None, call_log: Mutex::new(Vec::new()) }
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay); self
    }

    pub fn plates(&self) -> Vec<String> {
        self.call_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryLookup for MockRegistry {
    async fn lookup(&self, plate_id: &str) -> Result<RegistryInfo, ProviderError> {
        self.call_log.lock().unwrap().push(plate_id.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

/// Scripted plate reader. Readings are served in order, then empty strings.
pub struct MockPlateRecognizer {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    delay:     Option<Duration>,
    call_log:  Mutex<Vec<String>>,  // image urls
}

impl MockPlateRecognizer {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            delay:     None,
            call_log:  Mutex::new(Vec::new()),
        }
    }

    pub fn reading(plate: &str) -> Self {
        Self::new(vec![Ok(plate.to_string())])
    }

    /// Never finds a plate.
    pub fn blind() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay); self
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }
}

#[async_trait]
impl PlateRecognizer for MockPlateRecognizer {
    async fn extract(&self, image_url: &str) -> Result<String, ProviderError> {
        self.call_log.lock().unwrap().push(image_url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(String::new());
        }
        responses.remove(0)
    }
}
