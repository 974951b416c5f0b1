//! Mirror knowledge points into a remote table
//!
//! The remote table is treated as a read-only view of the local document: every push
//! clears the table and recreates one record per knowledge point.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use super::config::SyncConfig;
use super::{SyncError, SyncReport, SyncTarget};
use crate::storage::LearningData;
use crate::tables::TableApi;

/// Sync target backed by the open platform's table API
pub struct TableSync {
    api: Arc<dyn TableApi>,
    config: SyncConfig,
}

impl TableSync {
    pub fn new(api: Arc<dyn TableApi>, config: SyncConfig) -> Self {
        Self { api, config }
    }
}

#[async_trait]
impl SyncTarget for TableSync {
    fn name(&self) -> &str {
        "remote table"
    }

    async fn push(&self, data: &LearningData) -> Result<SyncReport, SyncError> {
        if !self.config.is_complete() {
            return Err(SyncError::NotConfigured(
                "table sync needs app id, app secret, app token and table id".to_string(),
            ));
        }

        let token = self
            .api
            .tenant_access_token(&self.config.credentials())
            .await?;
        let deleted = self
            .api
            .delete_all_records(&token, &self.config.app_token, &self.config.table_id)
            .await?;
        let created = self
            .api
            .batch_create(
                &token,
                &self.config.app_token,
                &self.config.table_id,
                build_records(data),
            )
            .await?;

        Ok(SyncReport { deleted, created })
    }
}

/// One record per knowledge point
pub fn build_records(data: &LearningData) -> Vec<Value> {
    let topic_titles: HashMap<Uuid, &str> = data
        .topics
        .iter()
        .map(|t| (t.id, t.title.as_str()))
        .collect();

    data.knowledge_points
        .iter()
        .map(|kp| {
            let next_review = kp
                .next_review
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            json!({
                "fields": {
                    "Topic": topic_titles.get(&kp.topic_id).copied().unwrap_or_default(),
                    "Knowledge point": kp.title,
                    "Description": kp.description,
                    "Mastery": kp.mastery,
                    "Reviews": kp.review_count,
                    "Next review": next_review,
                }
            })
        })
        .collect()
}
