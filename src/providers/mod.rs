use crate::error::ProviderError;
use crate::types::{Classification, ImageResult, RegistryInfo};
use async_trait::async_trait;
use std::sync::Arc;

mod google;
mod openai;
mod rdw;
mod mock;
mod timeout;

pub use google::{GoogleImageSearch, DEFAULT_CSE_ID};
pub use openai::{OpenAiVision, DEFAULT_VISION_MODEL};
pub use rdw::{RdwRegistry, DEFAULT_RDW_URL};
pub use mock::{MockImageSearch, MockClassifier, MockRegistry, MockPlateRecognizer};
pub use timeout::within;

/// Finds candidate images for a text query.
///
/// # Contract
/// - Results come back in the provider's relevance order; callers never re-sort.
/// - "No results" is `Ok(vec![])`, not an error.
#[async_trait]
pub trait ImageSearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<ImageResult>, ProviderError>;
}

/// Decides whether an image shows the expected car.
///
/// Returns `Err` when the image cannot be fetched or decoded by the provider.
/// The loop turns that into a miss for the current candidate.
#[async_trait]
pub trait VisionClassifier: Send + Sync {
    async fn classify(
        &self,
        image_url:            &str,
        expected_description: &str,
    ) -> Result<Classification, ProviderError>;
}

/// Looks a plate up in a vehicle registry.
///
/// A plate the registry does not know is `Ok(RegistryInfo::not_found())`.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn lookup(&self, plate_id: &str) -> Result<RegistryInfo, ProviderError>;
}

/// Reads the license plate visible in an image, best effort.
///
/// An empty string means no plate was found; it is not an error.
#[async_trait]
pub trait PlateRecognizer: Send + Sync {
    async fn extract(&self, image_url: &str) -> Result<String, ProviderError>;
}

/// The four external capabilities one engine talks to.
#[derive(Clone)]
pub struct Providers {
    pub search:     Arc<dyn ImageSearchProvider>,
    pub classifier: Arc<dyn VisionClassifier>,
    pub registry:   Arc<dyn RegistryLookup>,
    pub plates:     Arc<dyn PlateRecognizer>,
}
