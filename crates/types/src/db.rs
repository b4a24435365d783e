//! Filter types for reading the local coin store.

/// Filter for reading coins from the local database.
///
/// Results are always ordered by market-cap rank ascending, unranked last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoinFilter {
    /// Case-insensitive substring over name and symbol.
    pub search: Option<String>,
    /// Rows to skip.
    pub offset: u64,
    /// Maximum number of results to return.
    pub limit: Option<usize>,
}

impl CoinFilter {
    /// One page of the rank-ordered list.
    pub fn page(offset: u64, limit: usize) -> Self {
        Self {
            search: None,
            offset,
            limit: Some(limit),
        }
    }

    pub fn search(query: impl Into<String>, limit: usize) -> Self {
        Self {
            search: Some(query.into()),
            offset: 0,
            limit: Some(limit),
        }
    }
}
