use std::sync::Arc;

use poem::{Endpoint, EndpointExt, Response, Route};
use poem_openapi::OpenApiService;

use crate::presentation::http::endpoints::{
    health::HealthEndpoints, messages::MessagesEndpoints, root::ApiState,
    scheduler::SchedulerEndpoints,
};

pub mod endpoints;
pub mod mappers;
pub mod middleware;
pub mod responses;

/// Control plane: the API under `/api` and Swagger UI at `/`.
pub fn build_app(
    state: Arc<ApiState>,
    server_url: &str,
) -> impl Endpoint<Output = Response> + 'static {
    let api_service = OpenApiService::new(
        (
            HealthEndpoints,
            SchedulerEndpoints::new(state.clone()),
            MessagesEndpoints::new(state),
        ),
        "Messaging Dispatcher API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("{server_url}/api"));
    let ui = api_service.swagger_ui();

    Route::new()
        .nest("/api", api_service)
        .nest("/", ui)
        .around(middleware::request_context)
}
