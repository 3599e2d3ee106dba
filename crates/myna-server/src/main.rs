use anyhow::Result;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

mod configuration;
mod error;
mod routes;
mod state;

use configuration::Settings;
use myna::relay::RelayService;
use myna::service::azure::{AzureAssistantService, AzureServiceConfig};
use myna::service::base::{AssistantService, NewAssistant};
use myna::store::InMemoryThreadStore;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let settings = Settings::new()?;

    let service = Arc::new(AzureAssistantService::new(AzureServiceConfig {
        endpoint: settings.service.endpoint.clone(),
        api_key: settings.service.api_key.clone(),
        api_version: settings.service.api_version.clone(),
    })?);

    // Reuse the configured assistant or register a fresh one for this process
    let assistant_id = match settings.service.assistant_id.clone() {
        Some(id) => id,
        None => {
            let assistant = service
                .create_assistant(NewAssistant {
                    model: settings.service.model.clone(),
                    instructions: settings.service.instructions.clone(),
                    vector_store_id: settings.service.vector_store_id.clone(),
                })
                .await?;
            info!("registered assistant {}", assistant.id);
            assistant.id
        }
    };

    let relay = RelayService::new(service, Arc::new(InMemoryThreadStore::new()), assistant_id);

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(AppState {
        relay,
        model: settings.service.model.clone(),
    })
    .layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
