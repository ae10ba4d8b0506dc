use serde::Deserialize;

const MAX_LIMIT: i64 = 100;

/// Raw `?page=&limit=` values. Kept as strings so junk falls back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl PageQuery {
    pub fn resolve(&self, default_limit: i64) -> Page {
        let page = positive(self.page.as_deref()).unwrap_or(1);
        let limit = positive(self.limit.as_deref())
            .unwrap_or(default_limit)
            .min(MAX_LIMIT);
        Page { page, limit }
    }
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

fn positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn defaults_when_absent() {
        let p = PageQuery::default().resolve(5);
        assert_eq!(p, Page { page: 1, limit: 5 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn junk_and_non_positive_fall_back() {
        assert_eq!(query(Some("abc"), Some("x")).resolve(10), Page { page: 1, limit: 10 });
        assert_eq!(query(Some("0"), Some("-3")).resolve(5), Page { page: 1, limit: 5 });
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(query(None, Some("5000")).resolve(5).limit, MAX_LIMIT);
    }

    #[test]
    fn second_page_of_twelve() {
        let p = query(Some("2"), Some("5")).resolve(5);
        assert_eq!(p.offset(), 5);
        assert_eq!(p.total_pages(12), 3);
        assert_eq!(p.total_pages(10), 2);
        assert_eq!(p.total_pages(0), 0);
    }
}
