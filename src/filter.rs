use crate::models::{AdRecord, DateRange, FilterCriteria, Selector};
use chrono::{Days, NaiveDate};

/// Inclusive calendar window. `None` on a side means open on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Window {
    pub const UNBOUNDED: Window = Window {
        start: None,
        end: None,
    };

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start.is_none_or(|start| day >= start) && self.end.is_none_or(|end| day <= end)
    }
}

pub fn resolve_window(range: &DateRange, today: NaiveDate) -> Window {
    if range.start.is_some() || range.end.is_some() {
        return Window {
            start: range.start,
            end: range.end,
        };
    }
    match range.last_n_days {
        Some(days) => Window {
            start: Some(
                today
                    .checked_sub_days(Days::new(u64::from(days)))
                    .unwrap_or(NaiveDate::MIN),
            ),
            end: Some(today),
        },
        None => Window::UNBOUNDED,
    }
}

pub fn matches(record: &AdRecord, criteria: &FilterCriteria, window: &Window) -> bool {
    window.contains(record.period_start)
        && criteria.client.matches(record.client.as_deref())
        && criteria.manager.matches(record.manager.as_deref())
}

/// Keep the records that satisfy the date window and both selectors, in
/// their original order.
pub fn filter_records(
    records: &[AdRecord],
    criteria: &FilterCriteria,
    today: NaiveDate,
) -> Vec<AdRecord> {
    let window = resolve_window(&criteria.date_range, today);
    records
        .iter()
        .filter(|record| matches(record, criteria, &window))
        .cloned()
        .collect()
}

/// Records visible under a manager selector, ignoring dates and clients.
pub fn scope_by_manager<'a>(
    records: &'a [AdRecord],
    manager: &'a Selector,
) -> impl Iterator<Item = &'a AdRecord> + 'a {
    records
        .iter()
        .filter(move |record| manager.matches(record.manager.as_deref()))
}
