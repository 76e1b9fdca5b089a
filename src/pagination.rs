// src/pagination.rs
//
// Page-number pagination, `search` and `ordering` for list endpoints.
// Lists are filtered and sorted in memory after the store returns the rows
// visible to the caller.

use std::cmp::Ordering;

use actix_web::HttpRequest;
use serde::Serialize;

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE }
    }
}

impl PageRequest {
    /// An unparsable page number is a 404; a bad page size falls back to the default.
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> Result<Self, ApiError> {
        let page = match page {
            None => 1,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(invalid_page()),
            },
        };
        let page_size = page_size
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .map(|n| n.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Ok(Self { page, page_size })
    }
}

fn invalid_page() -> ApiError {
    ApiError::NotFound("Invalid page.".to_string())
}

/// Base URL and query string of the current request, for `next`/`previous` links.
#[derive(Debug, Clone, Default)]
pub struct PageLinks {
    base: String,
    query: Vec<String>,
}

impl PageLinks {
    pub fn from_request(req: &HttpRequest) -> Self {
        let info = req.connection_info();
        let base = format!("{}://{}{}", info.scheme(), info.host(), req.path());
        let query = req
            .query_string()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter(|pair| pair.split('=').next() != Some("page"))
            .map(str::to_string)
            .collect();
        Self { base, query }
    }

    fn link(&self, page: usize) -> String {
        let mut pairs = self.query.clone();
        if page > 1 {
            pairs.push(format!("page={}", page));
        }
        if pairs.is_empty() {
            self.base.clone()
        } else {
            format!("{}?{}", self.base, pairs.join("&"))
        }
    }
}

pub fn paginate<T>(items: Vec<T>, request: PageRequest, links: &PageLinks) -> Result<Page<T>, ApiError> {
    let count = items.len();
    let start = (request.page - 1).saturating_mul(request.page_size);
    if request.page > 1 && start >= count {
        return Err(invalid_page());
    }
    let results: Vec<T> = items.into_iter().skip(start).take(request.page_size).collect();
    let next = (start + results.len() < count).then(|| links.link(request.page + 1));
    let previous = (request.page > 1).then(|| links.link(request.page - 1));
    Ok(Page { count, next, previous, results })
}

/// Every whitespace or comma separated term must appear in at least one field.
pub fn search_matches(search: Option<&str>, fields: &[&str]) -> bool {
    let terms: Vec<String> = match search {
        Some(raw) => raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect(),
        None => return true,
    };
    let fields: Vec<String> = fields.iter().map(|f| f.to_lowercase()).collect();
    terms.iter().all(|term| fields.iter().any(|field| field.contains(term.as_str())))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(field) => SortKey { field: field.to_string(), descending: true },
            None => SortKey { field: raw.to_string(), descending: false },
        }
    }
}

/// Parses `?ordering=a,-b`, dropping unknown fields. Falls back to `default`.
pub fn ordering(raw: Option<&str>, allowed: &[&str], default: &str) -> Vec<SortKey> {
    let keys: Vec<SortKey> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SortKey::parse)
        .filter(|key| allowed.contains(&key.field.as_str()))
        .collect();
    if keys.is_empty() {
        vec![SortKey::parse(default)]
    } else {
        keys
    }
}

/// Stable sort by each key in turn, `compare` giving the ascending order of one field.
pub fn sort_by_keys<T>(items: &mut [T], keys: &[SortKey], compare: impl Fn(&T, &T, &str) -> Ordering) {
    items.sort_by(|a, b| {
        for key in keys {
            let ord = compare(a, b, &key.field);
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn links() -> PageLinks {
        let req = TestRequest::get()
            .uri("/api/tasks/?status=todo&page=2&page_size=2")
            .insert_header(("Host", "api.example.com"))
            .to_http_request();
        PageLinks::from_request(&req)
    }

    #[test]
    fn page_links_keep_filters() {
        let page = paginate((1..=5).collect(), PageRequest { page: 2, page_size: 2 }, &links()).unwrap();
        assert_eq!(page.count, 5);
        assert_eq!(page.results, vec![3, 4]);
        assert_eq!(
            page.next.as_deref(),
            Some("http://api.example.com/api/tasks/?status=todo&page_size=2&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://api.example.com/api/tasks/?status=todo&page_size=2")
        );
    }

    #[test]
    fn out_of_range_page_is_not_found() {
        let err = paginate(vec![1, 2], PageRequest { page: 3, page_size: 2 }, &links()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Invalid page."));
        let empty: Vec<i32> = Vec::new();
        assert!(paginate(empty, PageRequest::default(), &links()).is_ok());
    }

    #[test]
    fn page_size_is_capped() {
        let req = PageRequest::parse(Some("1"), Some("500")).unwrap();
        assert_eq!(req.page_size, MAX_PAGE_SIZE);
        let req = PageRequest::parse(None, Some("zero")).unwrap();
        assert_eq!(req.page_size, DEFAULT_PAGE_SIZE);
        assert!(PageRequest::parse(Some("0"), None).is_err());
        assert!(PageRequest::parse(Some("abc"), None).is_err());
    }

    #[test]
    fn search_requires_every_term() {
        assert!(search_matches(Some("web redesign"), &["Website Redesign", ""]));
        assert!(search_matches(Some("core"), &["Platform", "core services"]));
        assert!(!search_matches(Some("web mobile"), &["Website Redesign", ""]));
        assert!(search_matches(None, &["anything"]));
    }

    #[test]
    fn ordering_ignores_unknown_fields() {
        let keys = ordering(Some("-name,secret"), &["name", "created_at"], "-created_at");
        assert_eq!(keys, vec![SortKey { field: "name".into(), descending: true }]);
        let keys = ordering(Some("secret"), &["name"], "-created_at");
        assert_eq!(keys, vec![SortKey { field: "created_at".into(), descending: true }]);
    }

    #[test]
    fn sorts_by_multiple_keys() {
        let mut rows = vec![("b", 1), ("a", 2), ("a", 1)];
        let keys = ordering(Some("name,-n"), &["name", "n"], "name");
        sort_by_keys(&mut rows, &keys, |x, y, field| match field {
            "name" => x.0.cmp(y.0),
            _ => x.1.cmp(&y.1),
        });
        assert_eq!(rows, vec![("a", 2), ("a", 1), ("b", 1)]);
    }
}
