pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;

use services::{api_client::ApiClient, dashboard_client::DashboardClient, user_client::UserClient};
use std::sync::Arc;

pub use error::{ApiError, ExpiryCause};

/// Service clients sharing one authenticated `ApiClient`.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<ApiClient>,
    pub users: Arc<UserClient>,
    pub dashboard: Arc<DashboardClient>,
}

impl AppState {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            users: Arc::new(UserClient::new(api.clone())),
            dashboard: Arc::new(DashboardClient::new(api.clone())),
            api,
        }
    }
}
