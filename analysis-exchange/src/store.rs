use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::report::StoredReportRecord;

/// External persistence for report history. The core only ever writes
/// records it produced; reads serve the dashboard.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create(&self, record: StoredReportRecord) -> Result<()>;

    /// Most recent records for one owner, newest first.
    async fn recent_for_owner(&self, owner_id: &str, limit: usize)
    -> Result<Vec<StoredReportRecord>>;
}

/// In-memory implementation of [`ReportStore`], keyed by owner.
pub struct InMemoryReportStore {
    records: DashMap<String, Vec<StoredReportRecord>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl Default for InMemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn create(&self, record: StoredReportRecord) -> Result<()> {
        self.records
            .entry(record.owner_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn recent_for_owner(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredReportRecord>> {
        let mut records = self
            .records
            .get(owner_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{
        AnalysisReport, AnalysisRequest, DiseaseInfo, FoodAndNutrition, WhatToDoNow,
    };
    use chrono::{Duration, Utc};

    fn record(owner: &str, symptoms: &str) -> StoredReportRecord {
        let request = AnalysisRequest {
            symptoms: symptoms.to_string(),
            affected_area_image: None,
            seen_doctor: false,
            doctor_report_image: None,
        };
        let report = AnalysisReport {
            disease_info: DiseaseInfo {
                name: "Common cold".into(),
                local_name: "Cold".into(),
                description: "Viral infection.".into(),
            },
            what_to_do_now: WhatToDoNow {
                immediate_steps: vec![],
                emergency_advice: "".into(),
            },
            recommended_medicine: vec![],
            food_and_nutrition: FoodAndNutrition {
                foods_to_include: vec![],
                hydration_tips: vec![],
                foods_to_avoid: vec![],
                lifestyle_guidelines: vec![],
            },
            what_not_to_do: vec![],
            recovery_estimate: "".into(),
            additional_info: "".into(),
        };
        StoredReportRecord::new(owner, &request, report)
    }

    #[tokio::test]
    async fn returns_newest_first_with_limit() {
        let store = InMemoryReportStore::new();
        let mut oldest = record("user-1", "first");
        oldest.created_at = Utc::now() - Duration::hours(2);
        let mut middle = record("user-1", "second");
        middle.created_at = Utc::now() - Duration::hours(1);
        let newest = record("user-1", "third");

        store.create(oldest).await.unwrap();
        store.create(newest.clone()).await.unwrap();
        store.create(middle).await.unwrap();

        let recent = store.recent_for_owner("user-1", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].symptoms_text, "third");
        assert_eq!(recent[1].symptoms_text, "second");
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let store = InMemoryReportStore::new();
        store.create(record("user-1", "cough")).await.unwrap();

        assert!(store.recent_for_owner("user-2", 10).await.unwrap().is_empty());
        assert_eq!(store.recent_for_owner("user-1", 10).await.unwrap().len(), 1);
    }
}
