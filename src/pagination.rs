//! PaginationCursor (spec §4.9): per-task offset cycling, worker-scoped and
//! in-memory only. Never persisted across restarts.

use dashmap::DashMap;

use crate::config::{MAX_OFFSET, PAGE_SIZE};

#[derive(Default)]
pub struct PaginationCursor {
    offsets: DashMap<i64, u32>,
}

impl PaginationCursor {
    pub fn new() -> Self {
        Self { offsets: DashMap::new() }
    }

    pub fn current(&self, task_id: i64) -> u32 {
        self.offsets.get(&task_id).map(|o| *o).unwrap_or(0)
    }

    /// Advances or resets the cursor after a page of `items_returned` results.
    pub fn advance(&self, task_id: i64, items_returned: u32) {
        let current = self.current(task_id);
        let next = if items_returned < PAGE_SIZE || current >= MAX_OFFSET {
            0
        } else {
            current + PAGE_SIZE
        };
        self.offsets.insert(task_id, next);
    }

    pub fn reset(&self, task_id: i64) {
        self.offsets.insert(task_id, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_page_advances_by_page_size() {
        let cursor = PaginationCursor::new();
        cursor.advance(1, 200);
        assert_eq!(cursor.current(1), 200);
    }

    #[test]
    fn short_page_resets_to_zero() {
        let cursor = PaginationCursor::new();
        cursor.advance(1, 200);
        cursor.advance(1, 50);
        assert_eq!(cursor.current(1), 0);
    }

    #[test]
    fn offset_at_max_resets_even_on_full_page() {
        let cursor = PaginationCursor::new();
        for _ in 0..4 {
            cursor.advance(1, 200);
        }
        assert_eq!(cursor.current(1), 800);
        cursor.advance(1, 200);
        assert_eq!(cursor.current(1), 0);
    }

    #[test]
    fn tasks_are_independent() {
        let cursor = PaginationCursor::new();
        cursor.advance(1, 200);
        assert_eq!(cursor.current(2), 0);
    }
}
