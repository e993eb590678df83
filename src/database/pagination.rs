use serde::{Deserialize, Serialize};

/// One page of a windowed listing. `total_rows` comes from the query's
/// `COUNT(*) OVER()` column; `next_offset` and `prev_offset` are clamped to
/// valid page starts so walking past either end stays on the boundary page.
#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub page_count: i64,
    pub next_offset: i64,
    pub prev_offset: i64,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows();
        }

        let page_count = (total_rows + page_size - 1) / page_size;
        let last_offset = (page_count - 1) * page_size;

        Self {
            rows,
            total_rows,
            page_count,
            next_offset: (current_offset + page_size).min(last_offset),
            prev_offset: (current_offset - page_size).max(0),
        }
    }

    pub fn no_rows() -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            page_count: 0,
            next_offset: 0,
            prev_offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page() {
        let page = PageContext::<i32>::from_rows(vec![], 0, 6, 0);
        assert_eq!(page.total_rows, 0);
        assert_eq!(page.page_count, 0);
        assert_eq!(page.next_offset, 0);
    }

    #[test]
    fn offsets_clamp_to_bounds() {
        let rows: Vec<i32> = (0..6).collect();
        let page = PageContext::from_rows(rows, 14, 6, 6);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.prev_offset, 0);
        assert_eq!(page.next_offset, 12);
        assert_eq!(page.total_rows, 14);
    }

    #[test]
    fn first_page_has_no_negative_prev() {
        let page = PageContext::from_rows(vec![1, 2, 3], 3, 6, 0);
        assert_eq!(page.prev_offset, 0);
        assert_eq!(page.next_offset, 0);
    }

    #[test]
    fn exact_multiple_of_page_size_has_no_phantom_page() {
        let rows: Vec<i32> = (0..6).collect();
        let page = PageContext::from_rows(rows, 12, 6, 6);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.next_offset, 6);
        assert!(page.next_offset < page.total_rows);
    }
}
