mod handlers;

pub use handlers::{AboutResponse, ErrorResponse, FieldWarning, PredictResponse};

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::pipeline::PriceService;

pub fn create_router(service: PriceService) -> Router {
    let api = Router::new()
        .route("/predict", post(handlers::predict))
        .route("/form", get(handlers::form))
        .route("/about", get(handlers::about))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(service)
}
