// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, authoring, catalog, diagnostic, enrollment, evaluation, progress},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, catalog, evaluations, diagnostics, authoring).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config, Certificate Issuer).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let course_routes = Router::new()
        .route("/", get(catalog::list_courses))
        // Per-user lock state needs an authenticated principal
        .merge(
            Router::new()
                .route("/{id}", get(catalog::get_course))
                .route("/{id}/enroll", post(enrollment::enroll))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let learning_routes = Router::new()
        .route("/enrollments", get(enrollment::my_enrollments))
        .route("/certificates", get(enrollment::my_certificates))
        .route("/lessons/{id}", get(catalog::get_lesson))
        .route("/lessons/{id}/progress", post(progress::record_progress))
        .route("/evaluations/{id}", get(evaluation::get_for_taking))
        .route("/evaluations/{id}/submit", post(evaluation::submit))
        .route("/diagnostics", get(diagnostic::list_diagnostics))
        .route("/diagnostics/{id}", get(diagnostic::get_for_taking))
        .route("/diagnostics/{id}/submit", post(diagnostic::submit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let review_routes = Router::new()
        .route(
            "/evaluations/{id}/submissions",
            get(evaluation::list_submissions),
        )
        .route(
            "/submissions/{id}/review",
            post(evaluation::review_submission),
        )
        // Double middleware protection: Auth first, then staff check
        .layer(middleware::from_fn(staff_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let authoring_routes = Router::new()
        .route("/courses", post(authoring::create_course))
        .route(
            "/courses/{id}",
            put(authoring::update_course).delete(authoring::delete_course),
        )
        .route("/courses/{id}/modules", post(authoring::create_module))
        .route("/modules/{id}/lessons", post(authoring::create_lesson))
        .route("/lessons/{id}", put(authoring::update_lesson))
        .route("/evaluations", post(authoring::create_evaluation))
        .route(
            "/evaluations/{id}/questions",
            post(authoring::create_question),
        )
        .route("/questions/{id}", delete(authoring::delete_question))
        .route("/diagnostics", post(authoring::create_diagnostic))
        .route(
            "/diagnostics/{id}/questions",
            post(authoring::create_diagnostic_question),
        )
        .layer(middleware::from_fn(staff_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/courses", course_routes)
        .nest("/api", learning_routes)
        .nest("/api", review_routes)
        .nest("/api/authoring", authoring_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
