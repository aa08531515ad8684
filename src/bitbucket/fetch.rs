use std::time::Duration;

use tracing::info;

use super::BitbucketClient;
use crate::http::{
    Authenticator, BearerAuth, HttpRequest, HttpResponse, Sleeper, Transport, TransportError,
};

/// Total GET attempts, first one included.
pub const MAX_ATTEMPTS: u32 = 10;

/// Attempt `i` waits `i * BACKOFF_STEP` before attempt `i + 1`.
pub const BACKOFF_STEP: Duration = Duration::from_secs(5);

/// Rate limiting, and Bitbucket's own transient 555.
pub const RETRYABLE_STATUSES: [u16; 2] = [429, 555];

pub fn is_retryable(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

pub fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_STEP * attempt
}

impl<T: Transport, S: Sleeper> BitbucketClient<T, S> {
    /// GET `url` with bearer auth, retrying 429 and 555 with linear backoff.
    ///
    /// Returns the last response whatever its status; callers validate it.
    /// Transport failures are returned immediately without retrying.
    pub fn get_with_retry(
        &self,
        url: &str,
        auth: &BearerAuth,
    ) -> Result<HttpResponse, TransportError> {
        let mut attempt = 1;
        loop {
            info!(url, attempt, "getting");
            let response = self.transport.send(auth.authenticate(HttpRequest::get(url)))?;
            if !is_retryable(response.status) || attempt >= MAX_ATTEMPTS {
                return Ok(response);
            }

            let delay = backoff_delay(attempt);
            info!(
                status = response.status,
                delay_secs = delay.as_secs(),
                attempt,
                "retryable response, sleeping"
            );
            self.sleeper.sleep(delay);
            attempt += 1;
        }
    }
}
