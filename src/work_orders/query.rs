use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{WorkOrder, WorkOrderStatus};

/// Fixed listing page size.
pub const PAGE_SIZE: u32 = 10;

/// Caller-supplied listing filters. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderFilter {
    /// Case-insensitive substring of the work order number or product name.
    pub search: Option<String>,
    pub status: Option<WorkOrderStatus>,
    /// Inclusive lower bound on the deadline.
    pub deadline_from: Option<NaiveDate>,
    /// Inclusive upper bound on the deadline.
    pub deadline_to: Option<NaiveDate>,
}

impl WorkOrderFilter {
    pub fn is_empty(&self) -> bool {
        self.search_term().is_none()
            && self.status.is_none()
            && self.deadline_from.is_none()
            && self.deadline_to.is_none()
    }

    /// Trimmed, lower-cased search term; blank searches are ignored.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, order: &WorkOrder) -> bool {
        if let Some(term) = self.search_term() {
            let number = order.number.to_string().to_lowercase();
            let product = order.product_name.to_lowercase();
            if !number.contains(&term) && !product.contains(&term) {
                return false;
            }
        }
        if self.status.is_some_and(|status| status != order.status) {
            return false;
        }
        if self.deadline_from.is_some_and(|from| order.deadline < from) {
            return false;
        }
        if self.deadline_to.is_some_and(|to| order.deadline > to) {
            return false;
        }
        true
    }
}

/// A filter after role scoping has been applied. Built only by the listing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrderQuery {
    pub filter: WorkOrderFilter,
    /// Set for operators: only their own assignments are visible.
    pub operator_id: Option<Uuid>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl WorkOrderQuery {
    pub fn matches(&self, order: &WorkOrder) -> bool {
        self.operator_id.map_or(true, |id| order.operator_id == id) && self.filter.matches(order)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// One page of results plus the numbers needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let last_page = if total == 0 {
            1
        } else {
            u32::try_from(total.div_ceil(u64::from(per_page.max(1)))).unwrap_or(u32::MAX)
        };
        Self {
            items,
            page,
            per_page,
            total,
            last_page,
        }
    }

    pub fn has_more(&self) -> bool {
        self.page < self.last_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work_orders::WorkOrderNumber;
    use chrono::Utc;

    fn order(number_seq: u32, product: &str, deadline: NaiveDate, status: WorkOrderStatus) -> WorkOrder {
        let day = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        WorkOrder {
            id: Uuid::new_v4(),
            number: WorkOrderNumber::new(day, number_seq).unwrap(),
            product_name: product.to_string(),
            quantity: 5,
            deadline,
            status,
            operator_id: Uuid::nil(),
            created_by: Uuid::nil(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    #[test]
    fn test_search_matches_number_or_product_case_insensitively() {
        let o = order(7, "Steel Bracket", d(10), WorkOrderStatus::Pending);
        let by_product = WorkOrderFilter { search: Some("bracket".into()), ..Default::default() };
        let by_number = WorkOrderFilter { search: Some("wo-20250307-007".into()), ..Default::default() };
        let miss = WorkOrderFilter { search: Some("gear".into()), ..Default::default() };
        assert!(by_product.matches(&o));
        assert!(by_number.matches(&o));
        assert!(!miss.matches(&o));
    }

    #[test]
    fn test_deadline_range_is_inclusive() {
        let o = order(1, "Gear", d(10), WorkOrderStatus::Pending);
        let exact = WorkOrderFilter { deadline_from: Some(d(10)), deadline_to: Some(d(10)), ..Default::default() };
        let before = WorkOrderFilter { deadline_to: Some(d(9)), ..Default::default() };
        let after = WorkOrderFilter { deadline_from: Some(d(11)), ..Default::default() };
        assert!(exact.matches(&o));
        assert!(!before.matches(&o));
        assert!(!after.matches(&o));
    }

    #[test]
    fn test_status_filter_is_exact() {
        let o = order(1, "Gear", d(10), WorkOrderStatus::InProgress);
        let yes = WorkOrderFilter { status: Some(WorkOrderStatus::InProgress), ..Default::default() };
        let no = WorkOrderFilter { status: Some(WorkOrderStatus::Pending), ..Default::default() };
        assert!(yes.matches(&o));
        assert!(!no.matches(&o));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = WorkOrderFilter { search: Some("   ".into()), ..Default::default() };
        assert!(filter.is_empty());
    }

    #[test]
    fn test_page_math() {
        let page: Page<u8> = Page::new(vec![], 1, PAGE_SIZE, 0);
        assert_eq!(page.last_page, 1);
        assert!(!page.has_more());

        let page: Page<u8> = Page::new(vec![], 2, PAGE_SIZE, 21);
        assert_eq!(page.last_page, 3);
        assert!(page.has_more());
    }
}
