// View adapters are public API for embedding hosts; the CLI exercises only
// part of them
#![allow(dead_code)]

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::knowledge::KnowledgeManager;
use crate::models::{KnowledgePoint, KnowledgePointInfo, ReviewSchedule};
use crate::review::ReviewScheduler;
use crate::store::SlotStore;

fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Display projection of a knowledge point, dates preformatted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePointView {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_in_review_plan: bool,
}

impl From<&KnowledgePoint> for KnowledgePointView {
    fn from(point: &KnowledgePoint) -> Self {
        Self {
            id: point.id.to_string(),
            question: point.question.clone(),
            answer: point.answer.clone(),
            created_at: format_instant(point.created_at),
            updated_at: format_instant(point.updated_at),
            is_in_review_plan: point.is_in_review_plan,
        }
    }
}

/// Display projection of a schedule with its parent's content joined in.
/// A missing parent projects as empty strings rather than failing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItemView {
    pub id: String,
    pub knowledge_point_id: String,
    pub review_number: u32,
    pub review_date: String,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub recall_text: Option<String>,
    pub knowledge_point: KnowledgePointInfo,
}

impl ReviewItemView {
    pub fn project(schedule: &ReviewSchedule, point: Option<&KnowledgePoint>) -> Self {
        Self {
            id: schedule.id.to_string(),
            knowledge_point_id: schedule.knowledge_point_id.to_string(),
            review_number: schedule.review_number,
            review_date: format_instant(schedule.review_date),
            completed: schedule.completed,
            completed_at: schedule.completed_at.map(format_instant),
            recall_text: schedule.recall_text.clone(),
            knowledge_point: KnowledgePointInfo {
                question: point.map(|p| p.question.clone()).unwrap_or_default(),
                answer: point.map(|p| p.answer.clone()).unwrap_or_default(),
            },
        }
    }
}

/// Incremental pagination cursor over the knowledge point listing.
pub struct KnowledgeFeed<'a> {
    manager: KnowledgeManager<'a>,
    page_size: usize,
    offset: usize,
    has_more: bool,
    pub items: Vec<KnowledgePointView>,
}

impl<'a> KnowledgeFeed<'a> {
    pub fn new(store: &'a SlotStore, page_size: usize) -> Self {
        Self {
            manager: KnowledgeManager::new(store),
            page_size,
            offset: 0,
            has_more: true,
            items: Vec::new(),
        }
    }

    /// Append the next page; a short page means the listing is exhausted.
    /// Returns how many items were loaded.
    pub fn load_more(&mut self) -> usize {
        if !self.has_more {
            return 0;
        }
        let page = self.manager.list(self.page_size, self.offset);
        if page.len() < self.page_size {
            self.has_more = false;
        }
        self.offset += page.len();
        self.items.extend(page.iter().map(KnowledgePointView::from));
        page.len()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Drop everything loaded and start over from the first page.
    pub fn refresh(&mut self) {
        self.offset = 0;
        self.has_more = true;
        self.items.clear();
        self.load_more();
    }
}

/// Sequential traversal of today's due reviews: one card at a time, with
/// the running total and completion count a review screen needs.
pub struct ReviewSession<'a> {
    scheduler: ReviewScheduler<'a>,
    offset: usize,
    total: usize,
    completed_count: usize,
    current_id: Option<Uuid>,
    current: Option<ReviewItemView>,
}

impl<'a> ReviewSession<'a> {
    pub fn start(store: &'a SlotStore) -> Self {
        let mut session = Self {
            scheduler: ReviewScheduler::new(store),
            offset: 0,
            total: 0,
            completed_count: 0,
            current_id: None,
            current: None,
        };
        session.reload();
        session
    }

    fn reload(&mut self) {
        let (total, item) = self.scheduler.due_today(self.offset);
        self.total = total;
        self.current_id = item.as_ref().map(|s| s.id);
        self.current = item.map(|schedule| {
            let point = self.scheduler.resolve_point(&schedule);
            ReviewItemView::project(&schedule, point.as_ref())
        });
    }

    pub fn current(&self) -> Option<&ReviewItemView> {
        self.current.as_ref()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    /// Complete the current card and re-query at the same offset (the
    /// completed card has left the due list, so the next one slides in).
    /// Returns false when there is no current card.
    pub fn complete(&mut self, recall_text: Option<&str>) -> bool {
        let Some(id) = self.current_id else {
            return false;
        };
        self.scheduler.complete(id, recall_text);
        self.completed_count += 1;
        self.reload();
        true
    }

    /// Move past the current card without completing it.
    pub fn skip(&mut self) {
        if self.current.is_some() {
            self.offset += 1;
        }
        self.reload();
    }
}
