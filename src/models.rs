use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A question/answer pair owned by the user.
///
/// Wire fields are camelCase so the persisted slots and the export payload
/// share one record layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePoint {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_in_review_plan: bool,
}

/// One rung of a knowledge point's review ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSchedule {
    pub id: Uuid,
    pub knowledge_point_id: Uuid,
    pub review_number: u32,
    pub review_date: DateTime<Utc>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub recall_text: Option<String>,
}

impl ReviewSchedule {
    /// Due means not yet completed and scheduled before the cutoff instant.
    pub fn is_due_before(&self, cutoff: DateTime<Utc>) -> bool {
        !self.completed && self.review_date < cutoff
    }
}

/// The question/answer of a schedule's parent point, as shown during review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePointInfo {
    pub question: String,
    pub answer: String,
}

/// Full-store snapshot used for backup and restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub knowledge_points: Vec<KnowledgePoint>,
    pub review_schedules: Vec<ReviewSchedule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_knowledge_points: usize,
    pub points_in_review_plan: usize,
    pub pending_reviews_today: usize,
    pub completed_reviews_today: usize,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
