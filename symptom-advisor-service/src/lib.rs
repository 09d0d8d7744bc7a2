pub mod llm;
pub mod models;
pub mod service;
pub mod storage;

pub use llm::OpenRouterClient;
pub use service::{AppState, create_app};
pub use storage::PostgresReportStore;
