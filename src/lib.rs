//! Bitbucket Cloud pull request client.
//!
//! Fetches pull request listings, single pull requests and diffs over a
//! blocking HTTP transport, using OAuth2 client credentials for auth.
//! Rate-limited (429) and transient (555) responses are retried with linear
//! backoff; listings can follow `next` links up to a page budget.

pub mod bitbucket;
pub mod config;
pub mod http;
pub mod report;
