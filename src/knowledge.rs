use chrono::Utc;
use uuid::Uuid;

use crate::models::KnowledgePoint;
use crate::review::{self, ReviewScheduler};
use crate::store::{SlotStore, StoreError, KNOWLEDGE_POINTS_SLOT};

/// CRUD over knowledge points. Transitions of the review-plan flag are the
/// only path through which this component touches schedules.
pub struct KnowledgeManager<'a> {
    store: &'a SlotStore,
}

impl<'a> KnowledgeManager<'a> {
    pub fn new(store: &'a SlotStore) -> Self {
        Self { store }
    }

    /// All points, newest first. Equal timestamps keep their stored order.
    pub fn list_all(&self) -> Vec<KnowledgePoint> {
        let mut points: Vec<KnowledgePoint> = self.store.load_all(KNOWLEDGE_POINTS_SLOT);
        points.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        points
    }

    /// The `[offset, offset + limit)` slice of `list_all`. An offset past
    /// the end yields an empty vec, never an error.
    pub fn list(&self, limit: usize, offset: usize) -> Vec<KnowledgePoint> {
        self.list_all().into_iter().skip(offset).take(limit).collect()
    }

    /// Create a point and, when it joins the review plan, its ladder
    /// anchored at the start of the current day.
    pub fn create(&self, question: &str, answer: &str, in_review_plan: bool) -> KnowledgePoint {
        let mut points = self.list_all();
        let now = Utc::now();
        let point = KnowledgePoint {
            id: Uuid::new_v4(),
            question: question.to_string(),
            answer: answer.to_string(),
            created_at: now,
            updated_at: now,
            is_in_review_plan: in_review_plan,
        };
        points.insert(0, point.clone());
        self.store.save_all(KNOWLEDGE_POINTS_SLOT, &points);

        if in_review_plan {
            ReviewScheduler::new(self.store).generate_ladder(point.id, review::today());
        }
        point
    }

    /// Rewrite a point's content. `in_review_plan = None` keeps the stored
    /// flag; a resolved flag change regenerates or cascade-deletes the
    /// ladder. `createdAt` is preserved, `updatedAt` bumped.
    pub fn update(
        &self,
        id: Uuid,
        question: &str,
        answer: &str,
        in_review_plan: Option<bool>,
    ) -> Result<KnowledgePoint, StoreError> {
        let mut points = self.list_all();
        let index = points
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;

        let was_in_plan = points[index].is_in_review_plan;
        let now_in_plan = in_review_plan.unwrap_or(was_in_plan);

        let point = &mut points[index];
        point.question = question.to_string();
        point.answer = answer.to_string();
        point.updated_at = Utc::now();
        point.is_in_review_plan = now_in_plan;
        let updated = point.clone();
        self.store.save_all(KNOWLEDGE_POINTS_SLOT, &points);

        if was_in_plan != now_in_plan {
            let scheduler = ReviewScheduler::new(self.store);
            if now_in_plan {
                scheduler.generate_ladder(id, review::today());
            } else {
                scheduler.cascade_delete(id);
            }
        }
        Ok(updated)
    }

    /// Remove a point and cascade its schedules. Deleting an unknown id is
    /// a no-op.
    pub fn delete(&self, id: Uuid) {
        let mut points = self.list_all();
        points.retain(|p| p.id != id);
        self.store.save_all(KNOWLEDGE_POINTS_SLOT, &points);

        ReviewScheduler::new(self.store).cascade_delete(id);
    }

    pub fn get(&self, id: Uuid) -> Option<KnowledgePoint> {
        self.list_all().into_iter().find(|p| p.id == id)
    }
}
