use axum::{
    http::header,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod customer;
pub mod professional;
pub mod public;

use auth::ServerState;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK")))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn metrics() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], common::metrics::render())
}

/// Build the full application router: public, authenticated and role-gated routes.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let bearer = || middleware::from_fn_with_state(state.clone(), auth::require_bearer_token_state);

    // Public routes (health, metrics, login/register, catalog, directory)
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/admin/login", post(auth::admin_login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", get(auth::logout).post(auth::logout))
        .route("/api/services", get(catalog::list))
        .route("/api/services/search", get(catalog::search))
        .route("/api/services/categories", get(catalog::categories))
        .route("/api/services/:id", get(catalog::get))
        .route("/api/professionals", get(public::professionals));

    // Any authenticated role
    let signed_in = Router::new()
        .route("/api/auth/profile", get(auth::profile).put(auth::update_profile))
        .route("/api/auth/me", get(auth::me))
        .route("/api/service-requests", get(public::service_requests))
        .route_layer(bearer());

    let customer_routes = Router::new()
        .route("/dashboard", get(customer::dashboard))
        .route("/services/request", post(customer::create_request))
        .route("/requests", get(customer::list_requests))
        .route("/requests/:id", get(customer::get_request).put(customer::update_request))
        .route("/requests/:id/cancel", get(customer::cancel_request).post(customer::cancel_request))
        .route("/reviews", post(customer::submit_review))
        .route("/profile", get(customer::profile).put(customer::update_profile))
        .route("/professionals/:service_id", get(customer::professionals_for_service))
        .route("/stats", get(customer::stats))
        .route_layer(middleware::from_fn(auth::require_customer))
        .route_layer(bearer());

    let professional_routes = Router::new()
        .route("/dashboard", get(professional::dashboard))
        .route("/requests", get(professional::list_requests))
        .route("/requests/:id/accept", post(professional::accept))
        .route("/requests/:id/reject", post(professional::reject))
        .route("/requests/:id/complete", post(professional::complete))
        .route("/profile", get(professional::profile).put(professional::update_profile))
        .route_layer(middleware::from_fn(auth::require_professional))
        .route_layer(bearer());

    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/services", get(admin::list_services).post(admin::create_service))
        .route("/services/:id", put(admin::update_service).delete(admin::delete_service))
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/:id", put(admin::update_booking))
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/:id", put(admin::update_user).delete(admin::delete_user))
        .route("/users/:id/toggle-status", put(admin::toggle_user_status))
        .route("/professionals", get(admin::list_professionals))
        .route("/professionals/pending", get(admin::pending_professionals))
        .route("/professionals/:id/approve", post(admin::approve_professional))
        .route("/professionals/:id/block", post(admin::block_professional))
        .route("/professionals/:id/unblock", post(admin::unblock_professional))
        .route("/search/professionals", get(admin::search_professionals))
        .route("/exports/service-requests", post(admin::start_export))
        .route("/exports/:task_id", get(admin::get_export))
        .route("/jobs/daily-reminders", post(admin::run_daily_reminders))
        .route("/jobs/monthly-reports", post(admin::run_monthly_reports))
        .route("/jobs/test-email", post(admin::run_test_email))
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(bearer());

    // Compose
    public
        .merge(signed_in)
        .nest("/api/customer", customer_routes)
        .nest("/api/professional", professional_routes)
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", crate::openapi::ApiDoc::openapi()))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
