pub mod api_client;
pub mod dashboard_client;
pub mod metrics;
pub mod user_client;
