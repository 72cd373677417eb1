//! Paged, date-filtered PVZ listing.
//!
//! The store answers a listing with one flat join (pvz × reception × product,
//! left-joined on both sides, already ordered). [`group_rows`] folds that
//! stream back into the nested [`PvzOverview`] shape without extra queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pvz_core::{DomainError, DomainResult};
use pvz_receptions::{Product, Reception};

use crate::pvz::Pvz;

/// Page-size bounds applied to listing requests.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 30,
        }
    }
}

/// A validated listing request.
///
/// Date bounds are inclusive and filter which receptions are attached to a
/// PVZ, never which PVZs are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvzListQuery {
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    page: u32,
    limit: u32,
}

impl PvzListQuery {
    pub fn new(
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        page: Option<u32>,
        limit: Option<u32>,
        limits: &PageLimits,
    ) -> DomainResult<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(limits.default_limit);

        if page == 0 {
            return Err(DomainError::validation("page must be at least 1"));
        }
        if limit == 0 || limit > limits.max_limit {
            return Err(DomainError::validation(format!(
                "limit must be between 1 and {}",
                limits.max_limit
            )));
        }
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(DomainError::validation(
                    "startDate must not be after endDate",
                ));
            }
        }

        Ok(Self {
            start_date,
            end_date,
            page,
            limit,
        })
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of PVZs skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Whether a reception opened at `opened_at` falls inside the date window.
    pub fn includes(&self, opened_at: DateTime<Utc>) -> bool {
        self.start_date.is_none_or(|start| opened_at >= start)
            && self.end_date.is_none_or(|end| opened_at <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionOverview {
    pub reception: Reception,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvzOverview {
    pub pvz: Pvz,
    pub receptions: Vec<ReceptionOverview>,
}

/// One row of the listing join. Absent sides of the left joins are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewRow {
    pub pvz: Pvz,
    pub reception: Option<Reception>,
    pub product: Option<Product>,
}

/// Fold ordered join rows into nested overviews.
///
/// PVZs and receptions keep first-seen order, products keep row order. A row
/// without a reception only ensures its PVZ is present; a row without a
/// product only ensures its reception is present.
pub fn group_rows<I>(rows: I) -> Vec<PvzOverview>
where
    I: IntoIterator<Item = OverviewRow>,
{
    let mut out: Vec<PvzOverview> = Vec::new();

    for row in rows {
        let idx = match out.iter().rposition(|o| o.pvz.id == row.pvz.id) {
            Some(idx) => idx,
            None => {
                out.push(PvzOverview {
                    pvz: row.pvz,
                    receptions: Vec::new(),
                });
                out.len() - 1
            }
        };
        let overview = &mut out[idx];

        let Some(reception) = row.reception else {
            continue;
        };
        let r_idx = match overview
            .receptions
            .iter()
            .rposition(|r| r.reception.id == reception.id)
        {
            Some(r_idx) => r_idx,
            None => {
                overview.receptions.push(ReceptionOverview {
                    reception,
                    products: Vec::new(),
                });
                overview.receptions.len() - 1
            }
        };

        if let Some(product) = row.product {
            overview.receptions[r_idx].products.push(product);
        }
    }

    out
}
