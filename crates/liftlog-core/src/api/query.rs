use serde::Deserialize;

/// Options for list requests: filter expression, sort fields and relations
/// to expand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub expand: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Comma-separated fields, `-` prefix for descending, e.g. `-date`
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Comma-separated relation fields to expand, e.g. `exercise_id,workout_id`
    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    /// Query-string pairs for this query plus paging
    pub fn to_params(&self, page: u32, per_page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", page.to_string()), ("perPage", per_page.to_string())];
        if let Some(ref filter) = self.filter {
            params.push(("filter", filter.clone()));
        }
        if let Some(ref sort) = self.sort {
            params.push(("sort", sort.clone()));
        }
        if let Some(ref expand) = self.expand {
            params.push(("expand", expand.clone()));
        }
        params
    }
}

/// One page of a list response.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPage<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(rename = "perPage", default)]
    pub per_page: u32,
    #[serde(rename = "totalItems", default)]
    pub total_items: i64,
    #[serde(rename = "totalPages", default)]
    pub total_pages: i64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> ListPage<T> {
    /// Whether pages after this one exist
    pub fn has_more(&self, per_page: u32) -> bool {
        if self.total_pages >= 0 {
            i64::from(self.page) < self.total_pages
        } else {
            // Counting skipped: keep going while pages come back full
            self.items.len() as u32 >= per_page
        }
    }
}

/// Build an equality filter with the value quoted and escaped,
/// e.g. `workout_id="abc"`.
pub fn filter_eq(field: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{}=\"{}\"", field, escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_eq_escapes() {
        assert_eq!(filter_eq("user_id", "abc123"), r#"user_id="abc123""#);
        assert_eq!(filter_eq("notes", r#"a"b"#), r#"notes="a\"b""#);
    }

    #[test]
    fn test_to_params() {
        let query = ListQuery::new()
            .filter(filter_eq("workout_id", "w1"))
            .sort("+created")
            .expand("exercise_id");
        let params = query.to_params(2, 500);
        assert_eq!(params[0], ("page", "2".to_string()));
        assert_eq!(params[1], ("perPage", "500".to_string()));
        assert!(params.contains(&("filter", r#"workout_id="w1""#.to_string())));
        assert!(params.contains(&("sort", "+created".to_string())));
        assert!(params.contains(&("expand", "exercise_id".to_string())));

        assert_eq!(ListQuery::new().to_params(1, 30).len(), 2);
    }

    #[test]
    fn test_list_page_has_more() {
        let page: ListPage<i32> = serde_json::from_str(
            r#"{"page":1,"perPage":2,"totalItems":3,"totalPages":2,"items":[1,2]}"#,
        )
        .unwrap();
        assert!(page.has_more(2));

        let last: ListPage<i32> = serde_json::from_str(
            r#"{"page":2,"perPage":2,"totalItems":3,"totalPages":2,"items":[3]}"#,
        )
        .unwrap();
        assert!(!last.has_more(2));

        let uncounted: ListPage<i32> = serde_json::from_str(
            r#"{"page":1,"perPage":2,"totalItems":-1,"totalPages":-1,"items":[1,2]}"#,
        )
        .unwrap();
        assert!(uncounted.has_more(2));
    }
}
