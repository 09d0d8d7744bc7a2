use std::sync::Arc;

use analysis_exchange::{InMemoryReportStore, ReportStore};
use symptom_advisor_service::{OpenRouterClient, PostgresReportStore, create_app};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured JSON tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "symptom_advisor_service=debug,analysis_exchange=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

async fn create_report_store() -> Arc<dyn ReportStore> {
    match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let store = PostgresReportStore::connect(&database_url)
                .await
                .unwrap_or_else(|e| {
                    eprintln!("Failed to connect to PostgreSQL: {e}");
                    std::process::exit(1);
                });
            Arc::new(store)
        }
        Err(_) => {
            warn!("DATABASE_URL not set, report history will not survive restarts");
            Arc::new(InMemoryReportStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Missing credentials surface as an explicit configuration error at
    // call time; flag the deployment defect up front as well.
    if std::env::var("OPENROUTER_API_KEY").is_err() {
        warn!("OPENROUTER_API_KEY is not set, analysis calls will fail");
    }

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let model = Arc::new(OpenRouterClient::from_env());
    let store = create_report_store().await;
    let app = create_app(model, store);

    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    let addr = listener.local_addr()?;

    info!("Symptom Advisor Service starting on {}", addr);
    info!("Analysis endpoint: POST http://{}/analysis", addr);
    info!("Chat endpoint: POST http://{}/chat", addr);
    info!("Health check endpoint: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
