//! Maieutic - event-sourced tutoring conversation engine
//!
//! Records every input/output as an immutable timeline fact, folds
//! facts into a live session snapshot, and decides turn by turn which
//! role and strategy beat acts next.

mod actor;
mod api;
mod config;
mod director;
mod engine;
mod error;
mod event;
mod provider;
mod reducer;
mod session;
mod templates;
mod timeline;

use api::{create_router, AppState};
use config::{DirectorMode, EngineConfig};
use director::{DelegatedDirector, Director, HeuristicDirector};
use engine::Engine;
use provider::{Generator, HttpProvider, StubGenerator};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use templates::TemplateLibrary;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maieutic=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = EngineConfig::from_env();

    let port: u16 = std::env::var("MAIEUTIC_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let template_dir = PathBuf::from(
        std::env::var("MAIEUTIC_TEMPLATE_DIR").unwrap_or_else(|_| "templates".to_string()),
    );

    // Failure to load any templates is fatal to engine construction
    tracing::info!(dir = %template_dir.display(), "Loading templates");
    let templates = TemplateLibrary::load_dir(&template_dir)?;

    // Provider wiring: delegated decisions and real generation both
    // require a provider URL; without one the engine runs fully local
    // (heuristic director, stub generator).
    let provider_url = std::env::var("MAIEUTIC_PROVIDER_URL").ok();
    let provider_key = std::env::var("MAIEUTIC_PROVIDER_KEY").ok();
    let provider = match &provider_url {
        Some(url) => Some(Arc::new(HttpProvider::new(
            url.clone(),
            provider_key,
            config.provider_timeout,
        )?)),
        None => None,
    };

    let director: Box<dyn Director> = match (config.director_mode, &provider) {
        (DirectorMode::Delegated, Some(p)) => Box::new(DelegatedDirector::new(p.clone())),
        (DirectorMode::Delegated, None) => {
            tracing::warn!(
                "MAIEUTIC_DIRECTOR=delegated but no MAIEUTIC_PROVIDER_URL set, \
                 falling back to the heuristic director"
            );
            Box::new(HeuristicDirector)
        }
        (DirectorMode::Heuristic, _) => Box::new(HeuristicDirector),
    };

    let generator: Box<dyn Generator> = match &provider {
        Some(p) => Box::new(ArcGenerator(p.clone())),
        None => {
            tracing::warn!("No provider configured, running with the stub generator");
            Box::new(StubGenerator)
        }
    };

    let engine = Engine::new(config, templates, director, generator);
    let state = AppState::new(engine);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Maieutic engine listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Adapter so a shared provider can serve as the engine's generator
struct ArcGenerator(Arc<HttpProvider>);

#[async_trait::async_trait]
impl Generator for ArcGenerator {
    async fn generate(&self, instructions: &str) -> Result<String, provider::ProviderError> {
        self.0.generate(instructions).await
    }
}
