use crate::models::{ExportData, KnowledgePoint, ReviewSchedule, Statistics};
use crate::review::{self, day_window};
use crate::store::{SlotStore, StoreError, KNOWLEDGE_POINTS_SLOT, REVIEW_SCHEDULES_SLOT};

/// Summary counts plus whole-store snapshot export/import.
pub struct Aggregator<'a> {
    store: &'a SlotStore,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a SlotStore) -> Self {
        Self { store }
    }

    pub fn statistics(&self) -> Statistics {
        let points: Vec<KnowledgePoint> = self.store.load_all(KNOWLEDGE_POINTS_SLOT);
        let schedules: Vec<ReviewSchedule> = self.store.load_all(REVIEW_SCHEDULES_SLOT);
        let (today_start, tomorrow_start) = day_window(review::today());

        Statistics {
            total_knowledge_points: points.len(),
            points_in_review_plan: points.iter().filter(|p| p.is_in_review_plan).count(),
            pending_reviews_today: schedules
                .iter()
                .filter(|s| s.is_due_before(tomorrow_start))
                .count(),
            completed_reviews_today: schedules
                .iter()
                .filter(|s| {
                    s.completed
                        && s.completed_at
                            .is_some_and(|at| at >= today_start && at < tomorrow_start)
                })
                .count(),
        }
    }

    /// Serialize both collections as one backup payload.
    pub fn export(&self) -> Result<String, StoreError> {
        let snapshot = ExportData {
            knowledge_points: self.store.load_all(KNOWLEDGE_POINTS_SLOT),
            review_schedules: self.store.load_all(REVIEW_SCHEDULES_SLOT),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Replace both collections wholesale from a backup payload. A payload
    /// that fails to decode leaves the existing data untouched.
    pub fn import(&self, payload: &str) -> Result<(), StoreError> {
        let snapshot: ExportData = serde_json::from_str(payload)?;
        self.store
            .save_all(KNOWLEDGE_POINTS_SLOT, &snapshot.knowledge_points);
        self.store
            .save_all(REVIEW_SCHEDULES_SLOT, &snapshot.review_schedules);
        Ok(())
    }
}
