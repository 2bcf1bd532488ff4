//! Pass-through calls for the dashboard pages.
//!
//! Payloads stay as JSON values: the pages own their shapes and any metric
//! computed from them.

use crate::error::ApiError;
use crate::services::api_client::{ApiClient, ApiRequest};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const REVENUES_PATH: &str = "/api/receitas/";
const STRATEGIES_PATH: &str = "/api/estrategias/";
const WEEKLY_PATH: &str = "/api/gestao-semanal/";
const PROTOCOLS_PATH: &str = "/api/protocolos/";
const SELLERS_PATH: &str = "/api/vendedores/";

/// Filters appended to list calls as query parameters.
pub type ListParams<'a> = &'a [(&'a str, &'a str)];

pub struct DashboardClient {
    api: Arc<ApiClient>,
}

impl DashboardClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    // Retrospective

    pub async fn retrospective(&self, year: i32) -> Result<Value, ApiError> {
        let request = ApiRequest::get(format!("{}retrospectiva/", REVENUES_PATH)).query("ano", year);
        self.api.fetch_json(&request).await
    }

    pub async fn seller_comparison(&self, year: i32) -> Result<Value, ApiError> {
        let request =
            ApiRequest::get(format!("{}comparativo_vendedores/", REVENUES_PATH)).query("ano", year);
        self.api.fetch_json(&request).await
    }

    // Revenues

    pub async fn revenues(&self, params: ListParams<'_>) -> Result<Value, ApiError> {
        self.list(REVENUES_PATH, params).await
    }

    pub async fn create_revenue<T: Serialize + ?Sized>(&self, data: &T) -> Result<Value, ApiError> {
        self.create(REVENUES_PATH, data).await
    }

    pub async fn update_revenue<T: Serialize + ?Sized>(
        &self,
        id: &str,
        data: &T,
    ) -> Result<Value, ApiError> {
        self.update(REVENUES_PATH, id, data).await
    }

    pub async fn delete_revenue(&self, id: &str) -> Result<(), ApiError> {
        let request = ApiRequest::delete(detail_path(REVENUES_PATH, id));
        self.api.execute(&request).await
    }

    // Strategy

    pub async fn strategies(&self, params: ListParams<'_>) -> Result<Value, ApiError> {
        self.list(STRATEGIES_PATH, params).await
    }

    pub async fn create_strategy<T: Serialize + ?Sized>(&self, data: &T) -> Result<Value, ApiError> {
        self.create(STRATEGIES_PATH, data).await
    }

    pub async fn update_strategy<T: Serialize + ?Sized>(
        &self,
        id: &str,
        data: &T,
    ) -> Result<Value, ApiError> {
        self.update(STRATEGIES_PATH, id, data).await
    }

    pub async fn set_investments<T: Serialize + ?Sized>(
        &self,
        id: &str,
        data: &T,
    ) -> Result<Value, ApiError> {
        let path = format!("{}set_investimentos/", detail_path(STRATEGIES_PATH, id));
        let request = ApiRequest::post(path).json(data)?;
        self.api.fetch_json(&request).await
    }

    // Weekly management

    pub async fn weekly_entries(&self, params: ListParams<'_>) -> Result<Value, ApiError> {
        self.list(WEEKLY_PATH, params).await
    }

    pub async fn create_weekly_entry<T: Serialize + ?Sized>(
        &self,
        data: &T,
    ) -> Result<Value, ApiError> {
        self.create(WEEKLY_PATH, data).await
    }

    pub async fn update_weekly_entry<T: Serialize + ?Sized>(
        &self,
        id: &str,
        data: &T,
    ) -> Result<Value, ApiError> {
        self.update(WEEKLY_PATH, id, data).await
    }

    // Protocols

    pub async fn protocols(&self) -> Result<Value, ApiError> {
        self.list(PROTOCOLS_PATH, &[]).await
    }

    pub async fn create_protocol<T: Serialize + ?Sized>(&self, data: &T) -> Result<Value, ApiError> {
        self.create(PROTOCOLS_PATH, data).await
    }

    pub async fn update_protocol<T: Serialize + ?Sized>(
        &self,
        id: &str,
        data: &T,
    ) -> Result<Value, ApiError> {
        self.update(PROTOCOLS_PATH, id, data).await
    }

    // Sellers

    pub async fn sellers(&self) -> Result<Value, ApiError> {
        self.list(SELLERS_PATH, &[]).await
    }

    pub async fn create_seller<T: Serialize + ?Sized>(&self, data: &T) -> Result<Value, ApiError> {
        self.create(SELLERS_PATH, data).await
    }

    async fn list(&self, path: &str, params: ListParams<'_>) -> Result<Value, ApiError> {
        let request = params
            .iter()
            .fold(ApiRequest::get(path), |request, (key, value)| {
                request.query(*key, *value)
            });
        self.api.fetch_json(&request).await
    }

    async fn create<T: Serialize + ?Sized>(&self, path: &str, data: &T) -> Result<Value, ApiError> {
        let request = ApiRequest::post(path).json(data)?;
        self.api.fetch_json(&request).await
    }

    async fn update<T: Serialize + ?Sized>(
        &self,
        path: &str,
        id: &str,
        data: &T,
    ) -> Result<Value, ApiError> {
        let request = ApiRequest::patch(detail_path(path, id)).json(data)?;
        self.api.fetch_json(&request).await
    }
}

fn detail_path(collection: &str, id: &str) -> String {
    format!("{}{}/", collection, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_path_keeps_trailing_slash() {
        assert_eq!(detail_path(STRATEGIES_PATH, "42"), "/api/estrategias/42/");
    }
}
