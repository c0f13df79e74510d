use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use crate::knowledge::KnowledgeManager;
use crate::models::{KnowledgePoint, ReviewSchedule};
use crate::store::{SlotStore, REVIEW_SCHEDULES_SLOT};

/// Day offsets from the anchor day at which a point is reviewed. The length
/// of this ladder is the number of schedule rows generated per point.
pub const REVIEW_INTERVAL_DAYS: [i64; 4] = [1, 7, 16, 35];

/// Owns due-date computation and the traversal/completion protocol for
/// review schedules.
pub struct ReviewScheduler<'a> {
    store: &'a SlotStore,
}

impl<'a> ReviewScheduler<'a> {
    pub fn new(store: &'a SlotStore) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Vec<ReviewSchedule> {
        self.store.load_all(REVIEW_SCHEDULES_SLOT)
    }

    /// Create one pending schedule per ladder offset, anchored at the local
    /// midnight of `anchor`, and append them in a single batch write.
    pub fn generate_ladder(&self, point_id: Uuid, anchor: NaiveDate) {
        let mut schedules = self.all();
        for (index, days) in REVIEW_INTERVAL_DAYS.iter().enumerate() {
            schedules.push(ReviewSchedule {
                id: Uuid::new_v4(),
                knowledge_point_id: point_id,
                review_number: index as u32 + 1,
                review_date: local_midnight(anchor + Duration::days(*days)),
                completed: false,
                completed_at: None,
                recall_text: None,
            });
        }
        self.store.save_all(REVIEW_SCHEDULES_SLOT, &schedules);
    }

    /// Remove every schedule referencing the given point, completed or not.
    pub fn cascade_delete(&self, point_id: Uuid) {
        let mut schedules = self.all();
        schedules.retain(|s| s.knowledge_point_id != point_id);
        self.store.save_all(REVIEW_SCHEDULES_SLOT, &schedules);
    }

    fn due_list(&self, cutoff: DateTime<Utc>) -> Vec<ReviewSchedule> {
        let mut due: Vec<ReviewSchedule> = self
            .all()
            .into_iter()
            .filter(|s| s.is_due_before(cutoff))
            .collect();
        due.sort_by(|a, b| a.review_date.cmp(&b.review_date));
        due
    }

    /// Everything due today or overdue from any prior day, paginated one
    /// item at a time: returns the total due count and the single item at
    /// `offset`, or `None` when `offset` is past the end.
    pub fn due_today(&self, offset: usize) -> (usize, Option<ReviewSchedule>) {
        let (_, tomorrow_start) = day_window(today());
        let due = self.due_list(tomorrow_start);
        let total = due.len();
        (total, due.into_iter().nth(offset))
    }

    /// Mark a schedule completed, stamping `completedAt` and storing the
    /// recall text (dropped when empty). Missing ids and already-completed
    /// rows are silently ignored; `completedAt` is set exactly once.
    pub fn complete(&self, id: Uuid, recall_text: Option<&str>) {
        let mut schedules = self.all();
        let Some(schedule) = schedules.iter_mut().find(|s| s.id == id) else {
            return;
        };
        if schedule.completed {
            return;
        }
        schedule.completed = true;
        schedule.completed_at = Some(Utc::now());
        schedule.recall_text = recall_text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        self.store.save_all(REVIEW_SCHEDULES_SLOT, &schedules);
    }

    /// Resolve a schedule's parent point. Returns `None` when the parent is
    /// gone; callers decide whether that is an error or a display fallback.
    pub fn resolve_point(&self, schedule: &ReviewSchedule) -> Option<KnowledgePoint> {
        KnowledgeManager::new(self.store).get(schedule.knowledge_point_id)
    }
}

/// The current local calendar day.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The local midnight of a calendar day, as an absolute instant.
pub(crate) fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match midnight.and_local_timezone(Local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // Midnight skipped by a DST jump; fall back to the naive instant.
        LocalResult::None => Utc.from_utc_datetime(&midnight),
    }
}

/// Start-of-day and start-of-next-day instants for a local calendar day.
pub(crate) fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = day.succ_opt().unwrap_or(day);
    (local_midnight(day), local_midnight(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, SlotStore) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SlotStore::open(dir.path()).expect("Failed to open store");
        (dir, store)
    }

    fn seed_schedule(
        store: &SlotStore,
        point_id: Uuid,
        review_number: u32,
        review_date: DateTime<Utc>,
        completed: bool,
    ) -> Uuid {
        let scheduler = ReviewScheduler::new(store);
        let mut schedules = scheduler.all();
        let id = Uuid::new_v4();
        schedules.push(ReviewSchedule {
            id,
            knowledge_point_id: point_id,
            review_number,
            review_date,
            completed,
            completed_at: completed.then(Utc::now),
            recall_text: None,
        });
        store.save_all(REVIEW_SCHEDULES_SLOT, &schedules);
        id
    }

    mod ladder_tests {
        use super::*;

        #[test]
        fn generates_one_row_per_offset() {
            let (_dir, store) = setup_store();
            let scheduler = ReviewScheduler::new(&store);
            let point_id = Uuid::new_v4();

            scheduler.generate_ladder(point_id, today());

            let schedules = scheduler.all();
            assert_eq!(schedules.len(), REVIEW_INTERVAL_DAYS.len());
        }

        #[test]
        fn review_numbers_are_one_based_and_sequential() {
            let (_dir, store) = setup_store();
            let scheduler = ReviewScheduler::new(&store);

            scheduler.generate_ladder(Uuid::new_v4(), today());

            let numbers: Vec<u32> = scheduler.all().iter().map(|s| s.review_number).collect();
            assert_eq!(numbers, vec![1, 2, 3, 4]);
        }

        #[test]
        fn dates_match_anchor_plus_offsets() {
            let (_dir, store) = setup_store();
            let scheduler = ReviewScheduler::new(&store);
            let anchor = today();

            scheduler.generate_ladder(Uuid::new_v4(), anchor);

            for (schedule, days) in scheduler.all().iter().zip(REVIEW_INTERVAL_DAYS) {
                assert_eq!(
                    schedule.review_date,
                    local_midnight(anchor + Duration::days(days))
                );
            }
        }

        #[test]
        fn new_rows_start_pending() {
            let (_dir, store) = setup_store();
            let scheduler = ReviewScheduler::new(&store);

            scheduler.generate_ladder(Uuid::new_v4(), today());

            for schedule in scheduler.all() {
                assert!(!schedule.completed);
                assert!(schedule.completed_at.is_none());
                assert!(schedule.recall_text.is_none());
            }
        }

        #[test]
        fn appends_without_touching_other_ladders() {
            let (_dir, store) = setup_store();
            let scheduler = ReviewScheduler::new(&store);
            let first = Uuid::new_v4();
            let second = Uuid::new_v4();

            scheduler.generate_ladder(first, today());
            scheduler.generate_ladder(second, today());

            let schedules = scheduler.all();
            assert_eq!(schedules.len(), 2 * REVIEW_INTERVAL_DAYS.len());
            assert_eq!(
                schedules
                    .iter()
                    .filter(|s| s.knowledge_point_id == first)
                    .count(),
                REVIEW_INTERVAL_DAYS.len()
            );
        }
    }

    mod cascade_tests {
        use super::*;

        #[test]
        fn removes_only_the_given_points_rows() {
            let (_dir, store) = setup_store();
            let scheduler = ReviewScheduler::new(&store);
            let doomed = Uuid::new_v4();
            let kept = Uuid::new_v4();
            scheduler.generate_ladder(doomed, today());
            scheduler.generate_ladder(kept, today());

            scheduler.cascade_delete(doomed);

            let schedules = scheduler.all();
            assert_eq!(schedules.len(), REVIEW_INTERVAL_DAYS.len());
            assert!(schedules.iter().all(|s| s.knowledge_point_id == kept));
        }

        #[test]
        fn removes_completed_rows_too() {
            let (_dir, store) = setup_store();
            let scheduler = ReviewScheduler::new(&store);
            let point_id = Uuid::new_v4();
            let id = seed_schedule(&store, point_id, 1, Utc::now() - Duration::days(1), false);
            scheduler.complete(id, None);

            scheduler.cascade_delete(point_id);

            assert!(scheduler.all().is_empty());
        }

        #[test]
        fn unknown_point_is_a_no_op() {
            let (_dir, store) = setup_store();
            let scheduler = ReviewScheduler::new(&store);
            scheduler.generate_ladder(Uuid::new_v4(), today());

            scheduler.cascade_delete(Uuid::new_v4());

            assert_eq!(scheduler.all().len(), REVIEW_INTERVAL_DAYS.len());
        }
    }

    mod due_today_tests {
        use super::*;

        #[test]
        fn empty_store_has_nothing_due() {
            let (_dir, store) = setup_store();
            let scheduler = ReviewScheduler::new(&store);

            let (total, item) = scheduler.due_today(0);
            assert_eq!(total, 0);
            assert!(item.is_none());
        }

        #[test]
        fn fresh_ladder_is_not_due_on_its_anchor_day() {
            let (_dir, store) = setup_store();
            let scheduler = ReviewScheduler::new(&store);
            scheduler.generate_ladder(Uuid::new_v4(), today());

            let (total, item) = scheduler.due_today(0);
            assert_eq!(total, 0);
            assert!(item.is_none());
        }

        #[test]
        fn overdue_items_are_included() {
            let (_dir, store) = setup_store();
            seed_schedule(
                &store,
                Uuid::new_v4(),
                1,
                Utc::now() - Duration::days(3),
                false,
            );

            let scheduler = ReviewScheduler::new(&store);
            let (total, item) = scheduler.due_today(0);
            assert_eq!(total, 1);
            assert!(item.is_some());
        }

        #[test]
        fn completed_items_are_excluded() {
            let (_dir, store) = setup_store();
            seed_schedule(
                &store,
                Uuid::new_v4(),
                1,
                Utc::now() - Duration::days(3),
                true,
            );

            let scheduler = ReviewScheduler::new(&store);
            let (total, item) = scheduler.due_today(0);
            assert_eq!(total, 0);
            assert!(item.is_none());
        }

        #[test]
        fn tomorrow_is_excluded() {
            let (_dir, store) = setup_store();
            seed_schedule(
                &store,
                Uuid::new_v4(),
                1,
                local_midnight(today().succ_opt().unwrap()),
                false,
            );

            let scheduler = ReviewScheduler::new(&store);
            let (total, _) = scheduler.due_today(0);
            assert_eq!(total, 0);
        }

        #[test]
        fn most_overdue_sorts_first() {
            let (_dir, store) = setup_store();
            let newer = Uuid::new_v4();
            let older = Uuid::new_v4();
            seed_schedule(&store, newer, 1, Utc::now() - Duration::days(1), false);
            seed_schedule(&store, older, 1, Utc::now() - Duration::days(3), false);

            let scheduler = ReviewScheduler::new(&store);
            let (total, first) = scheduler.due_today(0);
            assert_eq!(total, 2);
            assert_eq!(first.unwrap().knowledge_point_id, older);

            let (_, second) = scheduler.due_today(1);
            assert_eq!(second.unwrap().knowledge_point_id, newer);
        }

        #[test]
        fn offset_past_end_returns_count_and_none() {
            let (_dir, store) = setup_store();
            seed_schedule(
                &store,
                Uuid::new_v4(),
                1,
                Utc::now() - Duration::days(1),
                false,
            );

            let scheduler = ReviewScheduler::new(&store);
            let (total, item) = scheduler.due_today(5);
            assert_eq!(total, 1);
            assert!(item.is_none());
        }

        #[test]
        fn completing_the_current_item_shrinks_the_list() {
            let (_dir, store) = setup_store();
            seed_schedule(
                &store,
                Uuid::new_v4(),
                1,
                Utc::now() - Duration::days(1),
                false,
            );

            let scheduler = ReviewScheduler::new(&store);
            let (total, item) = scheduler.due_today(0);
            assert_eq!(total, 1);

            scheduler.complete(item.unwrap().id, None);

            let (total, item) = scheduler.due_today(0);
            assert_eq!(total, 0);
            assert!(item.is_none());
        }
    }

    mod complete_tests {
        use super::*;

        #[test]
        fn sets_completion_fields() {
            let (_dir, store) = setup_store();
            let id = seed_schedule(
                &store,
                Uuid::new_v4(),
                1,
                Utc::now() - Duration::days(1),
                false,
            );

            let scheduler = ReviewScheduler::new(&store);
            scheduler.complete(id, Some("recalled the gist"));

            let schedule = scheduler.all().into_iter().find(|s| s.id == id).unwrap();
            assert!(schedule.completed);
            assert!(schedule.completed_at.is_some());
            assert_eq!(schedule.recall_text.as_deref(), Some("recalled the gist"));
        }

        #[test]
        fn empty_recall_text_is_dropped() {
            let (_dir, store) = setup_store();
            let id = seed_schedule(
                &store,
                Uuid::new_v4(),
                1,
                Utc::now() - Duration::days(1),
                false,
            );

            let scheduler = ReviewScheduler::new(&store);
            scheduler.complete(id, Some("   "));

            let schedule = scheduler.all().into_iter().find(|s| s.id == id).unwrap();
            assert!(schedule.completed);
            assert!(schedule.recall_text.is_none());
        }

        #[test]
        fn unknown_id_is_a_no_op() {
            let (_dir, store) = setup_store();
            seed_schedule(
                &store,
                Uuid::new_v4(),
                1,
                Utc::now() - Duration::days(1),
                false,
            );

            let scheduler = ReviewScheduler::new(&store);
            scheduler.complete(Uuid::new_v4(), Some("whatever"));

            assert!(scheduler.all().iter().all(|s| !s.completed));
        }

        #[test]
        fn completing_twice_keeps_the_first_stamp() {
            let (_dir, store) = setup_store();
            let id = seed_schedule(
                &store,
                Uuid::new_v4(),
                1,
                Utc::now() - Duration::days(1),
                false,
            );

            let scheduler = ReviewScheduler::new(&store);
            scheduler.complete(id, Some("first"));
            let first_stamp = scheduler
                .all()
                .into_iter()
                .find(|s| s.id == id)
                .unwrap()
                .completed_at;

            scheduler.complete(id, Some("second"));

            let schedule = scheduler.all().into_iter().find(|s| s.id == id).unwrap();
            assert_eq!(schedule.completed_at, first_stamp);
            assert_eq!(schedule.recall_text.as_deref(), Some("first"));
        }
    }

    mod join_tests {
        use super::*;

        #[test]
        fn resolves_the_parent_point() {
            let (_dir, store) = setup_store();
            let manager = KnowledgeManager::new(&store);
            let point = manager.create("q", "a", true);

            let scheduler = ReviewScheduler::new(&store);
            let schedule = scheduler.all().into_iter().next().unwrap();
            let resolved = scheduler.resolve_point(&schedule).unwrap();
            assert_eq!(resolved.id, point.id);
            assert_eq!(resolved.question, "q");
        }

        #[test]
        fn missing_parent_resolves_to_none() {
            let (_dir, store) = setup_store();
            let id = seed_schedule(
                &store,
                Uuid::new_v4(),
                1,
                Utc::now() - Duration::days(1),
                false,
            );

            let scheduler = ReviewScheduler::new(&store);
            let schedule = scheduler.all().into_iter().find(|s| s.id == id).unwrap();
            assert!(scheduler.resolve_point(&schedule).is_none());
        }
    }

    mod day_window_tests {
        use super::*;

        #[test]
        fn window_spans_exactly_one_day() {
            let (start, end) = day_window(today());
            assert_eq!(end - start, Duration::days(1));
        }

        #[test]
        fn now_falls_inside_todays_window() {
            let (start, end) = day_window(today());
            let now = Utc::now();
            assert!(now >= start && now < end);
        }
    }
}
