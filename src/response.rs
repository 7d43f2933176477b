use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone, PartialEq)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
    pub pages: Option<i64>,
    pub has_next: Option<bool>,
    pub has_prev: Option<bool>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
            pages: Some(pages),
            has_next: Some(page < pages),
            has_prev: Some(page > 1),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
            pages: None,
            has_next: None,
            has_prev: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Meta;

    #[test]
    fn meta_reports_neighbouring_pages() {
        let meta = Meta::new(2, 12, 30);
        assert_eq!(meta.pages, Some(3));
        assert_eq!(meta.has_next, Some(true));
        assert_eq!(meta.has_prev, Some(true));

        let last = Meta::new(3, 12, 30);
        assert_eq!(last.has_next, Some(false));
    }

    #[test]
    fn meta_for_empty_result() {
        let meta = Meta::new(1, 12, 0);
        assert_eq!(meta.pages, Some(0));
        assert_eq!(meta.has_next, Some(false));
        assert_eq!(meta.has_prev, Some(false));
    }
}
