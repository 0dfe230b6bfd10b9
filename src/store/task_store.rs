//! TaskStore: loads active tasks with their filter bags, and writes back
//! provisioned Slack channel info (spec §4.8, §4.11 scheduler loop).

use sqlx::FromRow;
use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::types::{BuyFormat, Condition, FilterBag, ItemType, Task, TaskStatus};

#[derive(Debug, FromRow)]
struct TaskRow {
    id: i64,
    user_id: i64,
    name: String,
    item_type: String,
    status: String,
    min_price: f64,
    max_price: f64,
    poll_interval: i64,
    min_seller_feedback: i64,
    exclude_keywords: String,
    listing_format: String,
    conditions: String,
    filters_json: String,
    min_profit_margin: f64,
    last_run: Option<String>,
    slack_channel: Option<String>,
    slack_channel_id: Option<String>,
}

pub struct TaskStore {
    pool: sqlx::SqlitePool,
}

impl TaskStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_active(&self) -> Result<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE status = 'active' ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_task).collect()
    }

    pub async fn set_slack_channel(&self, task_id: i64, channel: &str, channel_id: &str) -> Result<()> {
        sqlx::query("UPDATE tasks SET slack_channel = ?, slack_channel_id = ? WHERE id = ?")
            .bind(channel)
            .bind(channel_id)
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn touch_last_run(&self, task_id: i64) -> Result<()> {
        sqlx::query("UPDATE tasks SET last_run = ? WHERE id = ?")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_task(row: TaskRow) -> Result<Task> {
    let item_type: ItemType = row
        .item_type
        .parse()
        .map_err(|e: String| AppError::DataError(format!("task {}: {e}", row.id)))?;
    let status: TaskStatus = row
        .status
        .parse()
        .map_err(|e: String| AppError::DataError(format!("task {}: {e}", row.id)))?;

    let exclude_keywords: HashSet<String> = serde_json::from_str(&row.exclude_keywords)?;
    let listing_format_raw: Vec<String> = serde_json::from_str(&row.listing_format)?;
    let listing_format = listing_format_raw
        .iter()
        .filter_map(|s| BuyFormat::from_ebay_label(s))
        .collect::<HashSet<_>>();
    let conditions_raw: Vec<String> = serde_json::from_str(&row.conditions)?;
    let conditions = conditions_raw.iter().filter_map(|s| Condition::parse(s)).collect::<HashSet<_>>();

    let filters: FilterBag = serde_json::from_str(&row.filters_json)?;
    if filters.item_type() != item_type {
        return Err(AppError::DataError(format!(
            "task {}: filter bag type {:?} doesn't match item_type {:?}",
            row.id,
            filters.item_type(),
            item_type
        )));
    }

    Ok(Task {
        id: row.id,
        user_id: row.user_id,
        name: row.name,
        item_type,
        status,
        min_price: row.min_price,
        max_price: row.max_price,
        min_seller_feedback: row.min_seller_feedback,
        listing_format,
        exclude_keywords,
        conditions,
        filters,
        poll_interval_secs: row.poll_interval as u32,
        min_profit_margin: row.min_profit_margin,
        last_run: row
            .last_run
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&chrono::Utc)),
        slack_channel: row.slack_channel,
        slack_channel_id: row.slack_channel_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> sqlx::SqlitePool {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn lists_only_active_tasks_and_parses_filters() {
        let pool = test_pool().await;
        sqlx::query(
            r#"INSERT INTO tasks (user_id, name, item_type, status, min_price, max_price, filters_json, listing_format, conditions, exclude_keywords)
               VALUES (1, 'active hunt', 'jewelry', 'active', 0, 500, '{"item_type":"jewelry"}', '[]', '[]', '[]')"#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            r#"INSERT INTO tasks (user_id, name, item_type, status, min_price, max_price, filters_json, listing_format, conditions, exclude_keywords)
               VALUES (1, 'paused hunt', 'jewelry', 'paused', 0, 500, '{"item_type":"jewelry"}', '[]', '[]', '[]')"#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let store = TaskStore::new(pool);
        let tasks = store.list_active().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "active hunt");
        assert_eq!(tasks[0].item_type, ItemType::Jewelry);
    }

    #[tokio::test]
    async fn set_slack_channel_persists() {
        let pool = test_pool().await;
        sqlx::query(
            r#"INSERT INTO tasks (id, user_id, name, item_type, status, min_price, max_price, filters_json, listing_format, conditions, exclude_keywords)
               VALUES (1, 1, 'hunt', 'jewelry', 'active', 0, 500, '{"item_type":"jewelry"}', '[]', '[]', '[]')"#,
        )
        .execute(&pool)
        .await
        .unwrap();
        let store = TaskStore::new(pool);
        store.set_slack_channel(1, "gold-hunt", "C123").await.unwrap();
        let tasks = store.list_active().await.unwrap();
        assert_eq!(tasks[0].slack_channel.as_deref(), Some("gold-hunt"));
        assert_eq!(tasks[0].slack_channel_id.as_deref(), Some("C123"));
    }
}
