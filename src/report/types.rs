use crate::bitbucket::PullRequestSummary;

/// Something the CLI prints or writes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    PullRequests(PullRequestListing),
    /// A single PR as pretty-printed JSON
    Detail { pr_number: String, json: String },
    Diff(DiffReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestListing {
    pub project: String,
    pub repo: String,
    /// Pages requested to build the listing
    pub request_count: usize,
    pub pull_requests: Vec<PullRequestSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub pr_number: String,
    /// Files touched, in diff order
    pub files: Vec<String>,
    /// Full diff text; `None` when only the file list was asked for
    pub diff: Option<String>,
}
