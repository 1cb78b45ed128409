use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total_rows: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    /// `page` is 1-indexed. A zero `limit` is a count-only request.
    pub fn compute(page: u64, limit: u64, total_rows: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total_rows.div_ceil(limit)
        };

        Self {
            page,
            limit,
            total_rows,
            total_pages,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        }
    }
}

/// Largest row offset the driver can bind (Postgres `OFFSET` is a bigint).
const MAX_OFFSET: u64 = i64::MAX as u64;

pub fn offset(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit).min(MAX_OFFSET)
}

/// `None` when `(page - 1) * limit` does not fit a bigint offset.
pub fn checked_offset(page: u64, limit: u64) -> Option<u64> {
    page.saturating_sub(1)
        .checked_mul(limit)
        .filter(|offset| *offset <= MAX_OFFSET)
}
