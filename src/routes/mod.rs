use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod admin;
pub mod auth;
pub mod certificates;
pub mod dashboard;
pub mod health;
pub mod lookup;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let public_routes = Router::new()
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/confirm/:token", get(certificates::confirm_certificate))
        .route("/reject/:token", get(certificates::reject_certificate))
        .route("/certificate/view/:token", get(certificates::view_certificate))
        .route("/api/health", get(health::health_check));

    let admin_routes = Router::new()
        .route("/", get(admin::overview))
        .route("/users", post(admin::create_user))
        .route("/software", post(admin::create_software))
        .route("/peripherals", post(admin::create_peripheral))
        .route("/config-items", post(admin::create_configuration_item))
        .route("/upload/machine-users", post(admin::upload_machine_users))
        .route("/upload/machines", post(admin::upload_machines))
        .route("/report/download", get(admin::download_report));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route(
            "/certificates/new",
            get(certificates::new_certificate_form).post(certificates::create_certificate),
        )
        .route(
            "/certificate/edit/:id",
            get(certificates::edit_certificate_form).post(certificates::update_certificate),
        )
        .route("/api/auth/me", get(auth::me))
        .route("/api/machine-user", get(lookup::find_machine_user))
        .route("/api/machine", get(lookup::find_machine))
        .nest("/admin", admin_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 32))
}
