//! # myway_api
//!
//! HTTP API library for MyWay LMS.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use myway_core::access::AccessGate;
use myway_core::auth::jwt::TokenCodec;
use myway_core::auth::session::SessionManager;
use myway_core::models::auth::Role;
use myway_core::repo::Store;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{assignments, auth, courses, discussions, health, modules, organizations};
use crate::middleware::auth::{OrgScope, require_auth, require_org_role};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend.
    pub store: Arc<dyn Store>,
    /// Token codec built from the configured secret.
    pub codec: Arc<TokenCodec>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: ApiConfig) -> Self {
        let codec = Arc::new(config.token_codec());
        Self {
            store,
            codec,
            config,
        }
    }

    pub fn sessions(&self) -> SessionManager<dyn Store> {
        SessionManager::new(Arc::clone(&self.store), Arc::clone(&self.codec))
    }

    pub fn gate(&self) -> AccessGate<dyn Store> {
        AccessGate::new(Arc::clone(&self.store), Arc::clone(&self.codec))
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let any_member = from_fn_with_state(OrgScope::new(state.clone(), Role::ALL), require_org_role);
    let organizer = from_fn_with_state(
        OrgScope::new(state.clone(), Role::ORGANIZER_ONLY),
        require_org_role,
    );

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/signin", post(auth::signin_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/logout-all", post(auth::logout_all_handler))
        .route(
            "/organizations",
            get(organizations::list_mine_handler).post(organizations::create_handler),
        )
        .route(
            "/organizations/members",
            get(organizations::list_members_handler).layer(organizer),
        )
        .route("/organizations/{id}/join", post(organizations::join_handler))
        .route("/organizations/{id}/invite", post(organizations::invite_handler))
        .route("/organizations/{id}/switch", post(organizations::switch_handler))
        .route("/organizations/{id}/leave", post(organizations::leave_handler))
        .route("/organizations/{id}/courses", get(courses::list_by_org_handler))
        .route(
            "/courses",
            get(courses::list_current_handler)
                .layer(any_member)
                .post(courses::create_handler),
        )
        .route("/courses/{id}", get(courses::get_handler))
        .route(
            "/courses/{id}/modules",
            get(modules::list_modules_handler).post(modules::create_module_handler),
        )
        .route("/modules/{id}", get(modules::get_module_handler))
        .route(
            "/modules/{id}/materials",
            get(modules::list_materials_handler).post(modules::create_material_handler),
        )
        .route("/materials/{id}", get(modules::get_material_handler))
        .route(
            "/courses/{id}/assignments",
            get(assignments::list_handler).post(assignments::create_handler),
        )
        .route("/assignments/{id}", get(assignments::get_handler))
        .route("/assignments/{id}/submissions", post(assignments::submit_handler))
        .route("/submissions/{id}", get(assignments::get_submission_handler))
        .route("/submissions/{id}/grade", post(assignments::grade_handler))
        .route(
            "/courses/{id}/threads",
            get(discussions::list_threads_handler).post(discussions::create_thread_handler),
        )
        .route("/threads/{id}", get(discussions::get_thread_handler))
        .route("/threads/{id}/replies", post(discussions::reply_handler))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
