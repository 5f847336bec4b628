use chrono::{Datelike, Months, NaiveDate};

use super::{AppError, Result};

/// Due dates for a monthly schedule: `start + 1 month`, `start + 2 months`, ...
///
/// Month arithmetic clamps to the last day of shorter months
/// (Jan 31 + 1 month = Feb 28/29).
pub fn monthly_due_dates(start: NaiveDate, count: u32) -> Result<Vec<NaiveDate>> {
    (1..=count)
        .map(|i| {
            start.checked_add_months(Months::new(i)).ok_or_else(|| {
                AppError::validation(format!("Due date out of range for installment {}", i))
            })
        })
        .collect()
}

/// Whole days between `due` and `today`; zero when not yet due.
pub fn days_overdue(due: NaiveDate, today: NaiveDate) -> i64 {
    (today - due).num_days().max(0)
}

/// First and last day of the month before the one containing `today`.
pub fn previous_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first_this_month = today.with_day(1).unwrap_or(today);
    let last_prev = first_this_month.pred_opt().unwrap_or(first_this_month);
    let first_prev = last_prev.with_day(1).unwrap_or(last_prev);
    (first_prev, last_prev)
}

/// "March 2026"
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}
