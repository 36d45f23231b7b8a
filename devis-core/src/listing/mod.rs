//! Client-side projection of the proposal listing.

pub mod filter;
pub mod sort;

pub use filter::{FILTER_KEYS, FilterCriteria, PRICE_MAX, PRICE_MIN};
pub use sort::{SortDirection, SortSpec};

use crate::models::PersistedProposal;

pub struct ListingFilterSort;

impl ListingFilterSort {
    /// Keeps the records matching every active criterion, then orders them by
    /// `sort`. Records that compare equal keep their input order.
    pub fn apply<'a>(
        records: &'a [PersistedProposal],
        criteria: &FilterCriteria,
        sort: &SortSpec,
    ) -> Vec<&'a PersistedProposal> {
        let mut rows: Vec<&PersistedProposal> =
            records.iter().filter(|r| criteria.matches(r)).collect();
        if sort.key.is_some() {
            rows.sort_by(|a, b| sort.compare(a, b));
        }
        rows
    }
}
