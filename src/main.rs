mod config;
mod error;
mod models;
mod routes;
mod services;

use config::AppConfig;
use routes::AppState;
use services::dictionary::{Thai2EnglishClient, WordLookup};
use services::jobs::JobStore;
use services::llm::LLMClient;
use services::progress::FileProgressSink;
use services::response_time::{FileResponseTimeStore, ResponseTimeEstimator, ResponseTimeStore, SharedEstimator};
use services::session::SessionStore;
use services::story::StoryService;
use services::translation_cache::TranslationCache;
use services::transliteration::ScriptTransliterator;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();

    let response_times: Arc<dyn ResponseTimeStore> =
        Arc::new(FileResponseTimeStore::new(config.response_times_path()));
    let estimator = ResponseTimeEstimator::seeded_from(response_times.clone()).await;

    let story = Arc::new(StoryService::new(
        Arc::new(LLMClient::new(config.llm.clone())?),
        Arc::new(JobStore::new()),
        Arc::new(SessionStore::new()),
        Arc::new(SharedEstimator::new(estimator)),
        Arc::new(FileProgressSink::new(config.progress_dir())),
    ));

    let mut lookup = WordLookup::new(
        Arc::new(Thai2EnglishClient::new(config.dictionary_url.clone(), config.dictionary_timeout)?),
        Arc::new(TranslationCache::new(config.cache_ttl)),
    );
    let transliteration = &config.transliteration;
    if transliteration.script.is_file() {
        lookup = lookup.with_transliterator(Arc::new(ScriptTransliterator::new(
            transliteration.program.clone(),
            transliteration.script.clone(),
            transliteration.timeout,
        )));
    } else {
        tracing::warn!(
            "Transliteration script {} not found, lookups will not be romanized",
            transliteration.script.display()
        );
    }
    let lookup = Arc::new(lookup);

    spawn_maintenance(&config, story.clone(), lookup.clone());

    let app_state = AppState {
        story,
        lookup,
        response_times,
    };
    let app = routes::router(app_state, config.static_dir.clone());

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic sweeps of the job store, idle sessions and the translation cache.
fn spawn_maintenance(config: &AppConfig, story: Arc<StoryService>, lookup: Arc<WordLookup>) {
    let job_ttl = config.job_ttl;
    let session_ttl = config.session_ttl;
    let mut sweep = tokio::time::interval(config.job_sweep_interval.max(MIN_INTERVAL));
    tokio::spawn(async move {
        loop {
            sweep.tick().await;
            let jobs = story.jobs().sweep(job_ttl);
            let sessions = story.sessions().sweep(session_ttl);
            if jobs > 0 || sessions > 0 {
                tracing::debug!(
                    "Swept {} jobs and {} idle sessions ({} jobs, {} sessions left)",
                    jobs,
                    sessions,
                    story.jobs().len(),
                    story.sessions().len()
                );
            }
        }
    });

    let max_entries = config.cache_max_entries;
    let mut prune = tokio::time::interval(config.cache_prune_interval.max(MIN_INTERVAL));
    tokio::spawn(async move {
        loop {
            prune.tick().await;
            let evicted = lookup.cache().prune(max_entries);
            if evicted > 0 {
                tracing::debug!(
                    "Pruned {} translation cache entries, {} kept",
                    evicted,
                    lookup.cache().len()
                );
            }
        }
    });
}
