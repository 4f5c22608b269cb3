use crate::config::Config;
use crate::services::certificate::CertificateIssuer;
use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub issuer: Arc<dyn CertificateIssuer>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn CertificateIssuer> {
    fn from_ref(state: &AppState) -> Self {
        state.issuer.clone()
    }
}
