use std::sync::Arc;
use anyhow::Context;
use carfinder::config::Settings;
use carfinder::providers::{GoogleImageSearch, OpenAiVision, RdwRegistry};
use carfinder::{server, FinderBuilder};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("reading settings")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if settings.google_api_key.is_none() {
        tracing::warn!("GOOGLE_API_KEY is not set, image search will return no results");
    }

    let vision = match (&settings.openai_base_url, &settings.openai_api_key) {
        (Some(base), key) => OpenAiVision::with_base_url(base, key.clone().unwrap_or_default(), &settings.openai_model),
        (None, Some(key)) => OpenAiVision::with_api_key(key, &settings.openai_model),
        (None, None)      => OpenAiVision::new(&settings.openai_model),
    };
    let vision = Arc::new(vision);

    let engine = FinderBuilder::new()
        .image_search(Arc::new(GoogleImageSearch::new(settings.google_api_key.clone(), &settings.google_cse_id)))
        .classifier(vision.clone())
        .plate_recognizer(vision)
        .registry(Arc::new(RdwRegistry::new(&settings.rdw_base_url)))
        .config(settings.finder.clone())
        .build()
        .context("assembling the finder")?;

    tracing::info!(
        attempt_limit = settings.finder.attempt_limit,
        call_timeout_secs = settings.finder.call_timeout.as_secs(),
        model = %settings.openai_model,
        "finder ready"
    );

    server::serve(Arc::new(engine), settings.bind)
        .await
        .context("serving HTTP")?;
    Ok(())
}
