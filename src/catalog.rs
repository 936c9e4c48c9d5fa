//! Thin proxy over the third-party product catalog API. The storefront
//! client queries products and categories through here to avoid CORS; the
//! account core never touches this module.

use anyhow::Context;
use axum::{
    async_trait,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, instrument};

use crate::error::Error;
use crate::state::AppState;

/// Catalog query mirrored from the client: `search` takes precedence over
/// `category`, both page through `limit`/`skip`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_products(&self, query: &ProductQuery) -> anyhow::Result<Value>;
    async fn fetch_categories(&self) -> anyhow::Result<Value>;
}

pub struct HttpCatalog {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }
}

fn products_url(base_url: &str, query: &ProductQuery) -> anyhow::Result<Url> {
    let limit = query.limit.unwrap_or(100).to_string();
    let skip = query.skip.unwrap_or(0).to_string();

    let url = match (&query.search, &query.category) {
        (Some(search), _) => Url::parse_with_params(
            &format!("{base_url}/products/search"),
            &[
                ("q", search.as_str()),
                ("limit", limit.as_str()),
                ("skip", skip.as_str()),
            ],
        )?,
        (None, Some(category)) => Url::parse_with_params(
            &format!("{base_url}/products/category/{category}"),
            &[("limit", limit.as_str()), ("skip", skip.as_str())],
        )?,
        (None, None) => Url::parse_with_params(
            &format!("{base_url}/products"),
            &[("limit", limit.as_str()), ("skip", skip.as_str())],
        )?,
    };
    Ok(url)
}

#[async_trait]
impl CatalogClient for HttpCatalog {
    async fn fetch_products(&self, query: &ProductQuery) -> anyhow::Result<Value> {
        let url = products_url(&self.base_url, query)?;
        let data = self
            .http
            .get(url)
            .send()
            .await
            .context("catalog request")?
            .error_for_status()
            .context("catalog status")?
            .json()
            .await
            .context("catalog body")?;
        Ok(data)
    }

    async fn fetch_categories(&self) -> anyhow::Result<Value> {
        let url = Url::parse(&format!("{}/products/categories", self.base_url))?;
        let data = self
            .http
            .get(url)
            .send()
            .await
            .context("categories request")?
            .error_for_status()
            .context("categories status")?
            .json()
            .await
            .context("categories body")?;
        Ok(data)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/categories", get(list_categories))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Value>, Error> {
    let data = state.catalog.fetch_products(&query).await.map_err(|e| {
        error!(error = %e, "fetch products failed");
        Error::Store(e)
    })?;
    Ok(Json(data))
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Value>, Error> {
    let data = state.catalog.fetch_categories().await.map_err(|e| {
        error!(error = %e, "fetch categories failed");
        Error::Store(e)
    })?;
    Ok(Json(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://dummyjson.com";

    #[test]
    fn plain_listing_pages_with_defaults() {
        let url = products_url(BASE, &ProductQuery::default()).unwrap();
        assert_eq!(url.as_str(), "https://dummyjson.com/products?limit=100&skip=0");
    }

    #[test]
    fn search_takes_precedence_over_category() {
        let query = ProductQuery {
            search: Some("phone".into()),
            category: Some("laptops".into()),
            limit: Some(10),
            skip: Some(5),
        };
        let url = products_url(BASE, &query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://dummyjson.com/products/search?q=phone&limit=10&skip=5"
        );
    }

    #[test]
    fn category_filters_through_its_own_path() {
        let query = ProductQuery {
            category: Some("laptops".into()),
            ..Default::default()
        };
        let url = products_url(BASE, &query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://dummyjson.com/products/category/laptops?limit=100&skip=0"
        );
    }

    #[test]
    fn search_terms_are_query_encoded() {
        let query = ProductQuery {
            search: Some("red shirt".into()),
            ..Default::default()
        };
        let url = products_url(BASE, &query).unwrap();
        assert!(url.as_str().contains("q=red%20shirt") || url.as_str().contains("q=red+shirt"));
    }
}
