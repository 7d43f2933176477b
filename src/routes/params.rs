use std::str::FromStr;

use serde::Deserialize;
use utoipa::ToSchema;

use crate::{entity::sea_orm_active_enums::OrderStatus, error::AppError};

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        self.normalize_with_default(20)
    }

    pub fn normalize_with_default(&self, default_per_page: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(default_per_page).clamp(1, 100);
        // Saturates for absurd page numbers; the query then returns an empty page.
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
pub enum ProductSortBy {
    CreatedAt,
    UpdatedAt,
    Price,
    Name,
    Rating,
    ReviewCount,
}

impl FromStr for ProductSortBy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" | "createdAt" => Ok(ProductSortBy::CreatedAt),
            "updated_at" | "updatedAt" => Ok(ProductSortBy::UpdatedAt),
            "price" => Ok(ProductSortBy::Price),
            "name" => Ok(ProductSortBy::Name),
            "rating" => Ok(ProductSortBy::Rating),
            "review_count" | "reviewCount" => Ok(ProductSortBy::ReviewCount),
            other => Err(AppError::BadRequest(format!("Unknown sort field '{other}'"))),
        }
    }
}

// Query strings are decoded by serde_urlencoded, which cannot parse numbers
// through `#[serde(flatten)]`, so paging fields are repeated here.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Category name.
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn sort_by(&self) -> Result<ProductSortBy, AppError> {
        match self.sort_by.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse(),
            None => Ok(ProductSortBy::CreatedAt),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Escape `%`, `_` and `\` so user input matches literally inside a LIKE pattern.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let p = Pagination::default();
        assert_eq!(p.normalize_with_default(12), (1, 12, 0));

        let p = Pagination {
            page: Some(3),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (3, 100, 200));

        let p = Pagination {
            page: Some(0),
            per_page: Some(0),
        };
        assert_eq!(p.normalize(), (1, 1, 0));

        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(12),
        };
        let (page, per_page, offset) = p.normalize_with_default(12);
        assert_eq!((page, per_page), (i64::MAX, 12));
        assert_eq!(offset, i64::MAX);
    }

    #[test]
    fn huge_page_from_query_string_does_not_overflow() {
        let uri: axum::http::Uri = "/api/products?page=9223372036854775807&per_page=12"
            .parse()
            .unwrap();
        let axum::extract::Query(query) =
            axum::extract::Query::<ProductQuery>::try_from_uri(&uri).unwrap();
        let (_, _, offset) = query.pagination().normalize_with_default(12);
        assert!(offset > 0);
    }

    #[test]
    fn sort_field_accepts_both_spellings() {
        assert_eq!("reviewCount".parse::<ProductSortBy>().unwrap(), ProductSortBy::ReviewCount);
        assert_eq!("created_at".parse::<ProductSortBy>().unwrap(), ProductSortBy::CreatedAt);
        assert!("password_hash".parse::<ProductSortBy>().is_err());
    }

    #[test]
    fn missing_sort_field_defaults_to_creation_time() {
        let query = ProductQuery::default();
        assert_eq!(query.sort_by().unwrap(), ProductSortBy::CreatedAt);
    }

    #[test]
    fn product_query_parses_from_query_string() {
        let uri: axum::http::Uri = "/api/products?page=2&per_page=5&category=Rings&sort_by=price&order=asc"
            .parse()
            .unwrap();
        let axum::extract::Query(query) =
            axum::extract::Query::<ProductQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.pagination().normalize_with_default(12), (2, 5, 5));
        assert_eq!(query.category.as_deref(), Some("Rings"));
        assert_eq!(query.sort_by().unwrap(), ProductSortBy::Price);
        assert_eq!(query.order, Some(SortOrder::Asc));
    }

    #[test]
    fn order_query_parses_status() {
        let uri: axum::http::Uri = "/api/orders?status=shipped&page=1".parse().unwrap();
        let axum::extract::Query(query) =
            axum::extract::Query::<OrderListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.status, Some(OrderStatus::Shipped));
        assert_eq!(query.pagination().normalize(), (1, 20, 0));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("gold"), "%gold%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
    }
}
