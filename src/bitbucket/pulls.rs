use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{
    check_status_code, AccessToken, BitbucketClient, BitbucketError, PullRequestPage,
    PullRequestQuery, PullRequestResult, QueryParams,
};
use crate::http::{BearerAuth, HttpResponse, Sleeper, Transport};

pub const DEFAULT_MAX_PAGES: usize = 3;

/// Pause between consecutive page requests, on top of any retry backoff.
pub const PAGE_PAUSE: Duration = Duration::from_secs(2);

/// Bitbucket's paged collection wrapper.
#[derive(Deserialize)]
struct Page {
    values: Option<Vec<Value>>,
    next: Option<String>,
}

impl Page {
    fn from_response(response: &HttpResponse) -> Result<Self, BitbucketError> {
        Ok(response.json()?)
    }

    fn take_values(&mut self) -> Result<Vec<Value>, BitbucketError> {
        self.values.take().ok_or(BitbucketError::MissingValues)
    }
}

/// Append `segments` to the path of `base`, each percent-encoded as a single
/// segment, then `params` as a query string in insertion order.
pub fn build_url(
    base: &str,
    segments: &[&str],
    params: &QueryParams,
) -> Result<String, BitbucketError> {
    let invalid = |reason: String| BitbucketError::InvalidUrl {
        url: base.to_string(),
        reason,
    };
    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("URL cannot have path segments".to_string()))?
        .pop_if_empty()
        .extend(segments);
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter());
    }
    Ok(url.to_string())
}

impl<T: Transport, S: Sleeper> BitbucketClient<T, S> {
    /// `{api_base}/{project}/{repo}/pullrequests/{pr_number}` plus query.
    /// The PR segment is left empty for listings.
    pub fn pull_requests_url(
        &self,
        project: &str,
        repo: &str,
        pr_number: Option<&str>,
        params: &QueryParams,
    ) -> Result<String, BitbucketError> {
        build_url(
            &self.endpoints.api_base,
            &[project, repo, "pullrequests", pr_number.unwrap_or_default()],
            params,
        )
    }

    /// Fetch one pull request, or a listing of them.
    ///
    /// A single PR comes back as the parsed object. A listing returns the
    /// page's `values`; with `fetch_next_page` set, `next` links are followed
    /// until `max_pages` requests have been made, concatenating `values` in
    /// page order. Any page failing validation fails the whole call.
    #[instrument(
        skip(self, query, token),
        fields(project = %query.project, repo = %query.repo, pr = query.single_pr().unwrap_or_default())
    )]
    pub fn get_pull_requests(
        &self,
        query: &PullRequestQuery,
        token: &AccessToken,
    ) -> Result<PullRequestPage, BitbucketError> {
        let auth = BearerAuth::new(token.as_str());
        let url = self.pull_requests_url(
            &query.project,
            &query.repo,
            query.single_pr(),
            &query.params,
        )?;

        let response = self.get_with_retry(&url, &auth)?;
        let mut request_count = 1;
        log_response(query.debug, &response, request_count);
        check_status_code(&response)?;

        if query.single_pr().is_some() {
            return Ok(PullRequestPage {
                result: PullRequestResult::Single(response.json()?),
                request_count,
            });
        }

        let mut page = Page::from_response(&response)?;
        let mut values = page.take_values()?;

        if query.fetch_next_page {
            while let Some(next_url) = page.next.take() {
                if request_count >= query.max_pages {
                    debug!(requests = request_count, "page limit reached");
                    break;
                }
                self.sleeper.sleep(PAGE_PAUSE);

                let response = self.get_with_retry(&next_url, &auth)?;
                request_count += 1;
                log_response(query.debug, &response, request_count);
                check_status_code(&response)?;

                page = Page::from_response(&response)?;
                values.extend(page.take_values()?);
            }
        }

        info!(requests = request_count, pull_requests = values.len(), "fetched pull requests");
        Ok(PullRequestPage {
            result: PullRequestResult::List(values),
            request_count,
        })
    }
}

fn log_response(enabled: bool, response: &HttpResponse, request_count: usize) {
    if enabled {
        debug!(
            status = response.status,
            requests = request_count,
            body = %response.text_lossy(),
            "response"
        );
    }
}
