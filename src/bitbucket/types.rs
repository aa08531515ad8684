use std::fmt;

use serde_json::Value;

/// OAuth consumer key and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("secret", &"***")
            .finish()
    }
}

/// Bearer token returned by the token endpoint. Requested once per run and
/// never refreshed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Hosts the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// OAuth2 token endpoint
    pub token_url: String,
    /// Repository API root; `{project}/{repo}/pullrequests` is appended
    pub api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: "https://bitbucket.org/site/oauth2/access_token".to_string(),
            api_base: "https://api.bitbucket.org/2.0/repositories".to_string(),
        }
    }
}

/// Query parameters, serialized in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// What to fetch from the pull request endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestQuery {
    pub project: String,
    pub repo: String,
    /// Fetch this single PR instead of a page listing. Empty means unset.
    pub pr_number: Option<String>,
    /// Follow `next` links
    pub fetch_next_page: bool,
    /// Total request budget when following `next` links
    pub max_pages: usize,
    pub params: QueryParams,
    /// Log raw responses
    pub debug: bool,
}

impl PullRequestQuery {
    pub fn list(project: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            repo: repo.into(),
            pr_number: None,
            fetch_next_page: false,
            max_pages: super::pulls::DEFAULT_MAX_PAGES,
            params: QueryParams::new(),
            debug: false,
        }
    }

    pub fn single(
        project: impl Into<String>,
        repo: impl Into<String>,
        pr_number: impl Into<String>,
    ) -> Self {
        Self {
            pr_number: Some(pr_number.into()),
            ..Self::list(project, repo)
        }
    }

    /// Follow `next` links until `max_pages` requests have been made.
    pub fn with_next_pages(mut self, max_pages: usize) -> Self {
        self.fetch_next_page = true;
        self.max_pages = max_pages;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(name, value);
        self
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The PR number, if one was given and is non-empty.
    pub fn single_pr(&self) -> Option<&str> {
        self.pr_number.as_deref().filter(|number| !number.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PullRequestResult {
    /// A single PR object, returned as-is
    Single(Value),
    /// `values` of every fetched page, first page first
    List(Vec<Value>),
}

impl PullRequestResult {
    pub fn into_values(self) -> Vec<Value> {
        match self {
            PullRequestResult::Single(value) => vec![value],
            PullRequestResult::List(values) => values,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestPage {
    pub result: PullRequestResult,
    /// Number of page requests made (retries not counted)
    pub request_count: usize,
}

/// Raw diff text plus the file paths named in its `diff --git` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub text: String,
    /// In order of appearance, duplicates kept
    pub files: Vec<String>,
}

/// The handful of PR fields worth showing in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
    pub id: Option<u64>,
    pub title: String,
    pub author: String,
    pub state: String,
    pub source_branch: String,
    pub destination_branch: String,
}

impl PullRequestSummary {
    pub fn from_value(value: &Value) -> Self {
        let text = |pointer: &str| {
            value
                .pointer(pointer)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            id: value.get("id").and_then(Value::as_u64),
            title: text("/title"),
            author: text("/author/display_name"),
            state: text("/state"),
            source_branch: text("/source/branch/name"),
            destination_branch: text("/destination/branch/name"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_params_keep_insertion_order() {
        let params = QueryParams::new().with("state", "OPEN").with("fields", "values");
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("state", "OPEN"), ("fields", "values")]);
    }

    #[test]
    fn test_single_pr_ignores_empty_number() {
        assert_eq!(PullRequestQuery::single("P", "R", "").single_pr(), None);
        assert_eq!(PullRequestQuery::single("P", "R", "7").single_pr(), Some("7"));
        assert_eq!(PullRequestQuery::list("P", "R").single_pr(), None);
    }

    #[test]
    fn test_list_query_defaults() {
        let query = PullRequestQuery::list("P", "R");
        assert!(!query.fetch_next_page);
        assert_eq!(query.max_pages, 3);
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_secrets_not_in_debug_output() {
        let rendered = format!(
            "{:?} {:?}",
            Credentials::new("id", "hunter2"),
            AccessToken::new("tok-123")
        );
        assert!(rendered.contains("id"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("tok-123"));
    }

    #[test]
    fn test_summary_from_value() {
        let value = json!({
            "id": 12,
            "title": "Fix login",
            "state": "OPEN",
            "author": {"display_name": "Sam"},
            "source": {"branch": {"name": "fix/login"}},
            "destination": {"branch": {"name": "main"}}
        });
        let summary = PullRequestSummary::from_value(&value);
        assert_eq!(summary.id, Some(12));
        assert_eq!(summary.title, "Fix login");
        assert_eq!(summary.author, "Sam");
        assert_eq!(summary.source_branch, "fix/login");
        assert_eq!(summary.destination_branch, "main");
    }

    #[test]
    fn test_summary_tolerates_missing_fields() {
        let summary = PullRequestSummary::from_value(&json!({"title": "Only title"}));
        assert_eq!(summary.id, None);
        assert_eq!(summary.title, "Only title");
        assert!(summary.author.is_empty());
    }
}
