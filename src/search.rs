//! SearchAdapter (spec §6, §6.1): the marketplace keyword-search boundary,
//! modeled as a trait so the scheduler can run against a fake in tests.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::PAGE_SIZE;
use crate::error::{AppError, Result};
use crate::types::{ListingSummary, Task};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    keywords: &'a str,
    #[serde(rename = "minPrice", skip_serializing_if = "Option::is_none")]
    min_price: Option<f64>,
    #[serde(rename = "maxPrice", skip_serializing_if = "Option::is_none")]
    max_price: Option<f64>,
    #[serde(rename = "listingType")]
    listing_type: Vec<String>,
    #[serde(rename = "minFeedback")]
    min_feedback: i64,
    #[serde(rename = "itemType")]
    item_type: String,
    #[serde(rename = "typeSpecificFilters")]
    type_specific_filters: serde_json::Value,
    condition: Vec<String>,
    #[serde(rename = "categoryIds", skip_serializing_if = "Option::is_none")]
    category_ids: Option<Vec<String>>,
    offset: u32,
}

#[derive(Debug, serde::Deserialize)]
struct SearchResponse {
    items: Vec<ListingSummary>,
}

#[async_trait]
pub trait SearchAdapter: Send + Sync {
    async fn search(
        &self,
        task: &Task,
        keywords: &str,
        filters_query: serde_json::Value,
        offset: u32,
    ) -> Result<Vec<ListingSummary>>;
}

pub struct HttpSearchAdapter {
    http: reqwest::Client,
    search_url: String,
}

impl HttpSearchAdapter {
    pub fn new(http: reqwest::Client, search_url: String) -> Self {
        Self { http, search_url }
    }
}

#[async_trait]
impl SearchAdapter for HttpSearchAdapter {
    async fn search(
        &self,
        task: &Task,
        keywords: &str,
        filters_query: serde_json::Value,
        offset: u32,
    ) -> Result<Vec<ListingSummary>> {
        let request = SearchRequest {
            keywords,
            min_price: Some(task.min_price),
            max_price: Some(task.max_price),
            listing_type: task.listing_format.iter().map(|f| f.as_str().to_string()).collect(),
            min_feedback: task.min_seller_feedback,
            item_type: task.item_type.to_string(),
            type_specific_filters: filters_query,
            condition: task.conditions.iter().map(|c| c.as_str().to_string()).collect(),
            category_ids: None,
            offset,
        };

        let resp = self.http.post(&self.search_url).json(&request).send().await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::DataError("search adapter rate limited".to_string()));
        }
        if !resp.status().is_success() {
            return Err(AppError::DataError(format!("search adapter returned {}", resp.status())));
        }

        let parsed: SearchResponse = resp.json().await?;
        if parsed.items.len() as u32 > PAGE_SIZE {
            return Err(AppError::DataError("search adapter returned more than one page".to_string()));
        }
        Ok(parsed.items)
    }
}
