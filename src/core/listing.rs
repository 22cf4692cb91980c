//! Pagination, search and ordering shared by every collection endpoint.
//!
//! Collections are paged (`page`, `page_size`), optionally narrowed by a
//! free-text `search` term and sorted by `ordering` (`field` or `-field`).
//! Each resource passes the list of fields it allows to be sorted on.

use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, EntityTrait, Order, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};

/// Page size used when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Largest page a client may request
pub const MAX_PAGE_SIZE: u64 = 100;

/// Query-string parameters common to every collection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    /// One-based page number
    pub page: Option<u64>,
    /// Number of results per page
    pub page_size: Option<u64>,
    /// Free-text search term
    pub search: Option<String>,
    /// Field to sort by, prefixed with `-` for descending
    pub ordering: Option<String>,
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Total number of matching records
    pub count: u64,
    /// One-based page number
    pub page: u64,
    /// Requested page size
    pub page_size: u64,
    /// Records on this page
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Replaces the results with an already converted list.
    pub fn with_results<U>(self, results: Vec<U>) -> Page<U> {
        Page {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            results,
        }
    }
}

impl ListParams {
    /// One-based page number, at least 1.
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Trimmed search term, `None` when blank.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Parses `ordering` against the fields the resource allows.
    ///
    /// Returns `Ok(None)` when no ordering was requested.
    ///
    /// # Errors
    /// Returns a validation error when the field is not in `allowed`.
    pub fn ordering<'a>(&'a self, allowed: &[&str]) -> Result<Option<(&'a str, Order)>> {
        let Some(raw) = self.ordering.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let (field, order) = match raw.strip_prefix('-') {
            Some(field) => (field, Order::Desc),
            None => (raw, Order::Asc),
        };
        if allowed.contains(&field) {
            Ok(Some((field, order)))
        } else {
            Err(Error::validation(
                "ordering",
                format!("cannot order by '{field}' (allowed: {})", allowed.join(", ")),
            ))
        }
    }
}

/// Runs `select` and returns the requested page.
pub async fn paginate<C, E>(db: &C, select: Select<E>, params: &ListParams) -> Result<Page<E::Model>>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Sync + 'static,
{
    let page = params.page();
    let page_size = params.page_size();
    let paginator = select.paginate(db, page_size);
    let count = paginator.num_items().await?;
    let results = paginator.fetch_page(page - 1).await?;
    Ok(Page {
        count,
        page,
        page_size,
        results,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn params(ordering: &str) -> ListParams {
        ListParams {
            ordering: Some(ordering.to_string()),
            ..ListParams::default()
        }
    }

    #[test]
    fn test_page_defaults_and_clamping() {
        let p = ListParams::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.page_size(), DEFAULT_PAGE_SIZE);

        let p = ListParams {
            page: Some(0),
            page_size: Some(10_000),
            ..ListParams::default()
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_ordering_parsing() {
        let allowed = ["name", "price"];
        assert!(params("").ordering(&allowed).unwrap().is_none());

        let descending = params("-price");
        let (field, order) = descending.ordering(&allowed).unwrap().unwrap();
        assert_eq!(field, "price");
        assert_eq!(order, Order::Desc);

        let ascending = params("name");
        let (field, order) = ascending.ordering(&allowed).unwrap().unwrap();
        assert_eq!(field, "name");
        assert_eq!(order, Order::Asc);

        assert!(matches!(
            params("password").ordering(&allowed),
            Err(Error::Validation { field: "ordering", .. })
        ));
    }

    #[test]
    fn test_search_term_ignores_blank() {
        let p = ListParams {
            search: Some("   ".to_string()),
            ..ListParams::default()
        };
        assert!(p.search_term().is_none());

        let p = ListParams {
            search: Some(" causa ".to_string()),
            ..ListParams::default()
        };
        assert_eq!(p.search_term(), Some("causa"));
    }
}
