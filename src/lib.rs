// Scopus Sweep - concurrent keyword-combination search over the Scopus API

pub mod config;
pub mod types;
pub mod query;     // Combination expansion and query grammar
pub mod search;    // Search backends (Scopus)
pub mod normalize;
pub mod events;
pub mod store;
pub mod executor;
pub mod export;
pub mod session;
pub mod models;
pub mod routes;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
