use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{error_message, AccessToken, AuthError, BitbucketClient, Credentials};
use crate::http::{Authenticator, BasicAuth, HttpRequest, Sleeper, Transport};

const GRANT_TYPE: (&str, &str) = ("grant_type", "client_credentials");

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl<T: Transport, S: Sleeper> BitbucketClient<T, S> {
    /// Exchange OAuth consumer credentials for a bearer token.
    ///
    /// Makes exactly one POST; failures are not retried. With `debug` set,
    /// the raw token response is logged.
    #[instrument(skip(self, credentials, debug), fields(client_id = %credentials.client_id))]
    pub fn request_access_token(
        &self,
        credentials: &Credentials,
        debug: bool,
    ) -> Result<AccessToken, AuthError> {
        let auth = BasicAuth::new(&credentials.client_id, &credentials.secret);
        let request = auth.authenticate(HttpRequest::post_form(
            &self.endpoints.token_url,
            &[GRANT_TYPE],
        ));

        info!("requesting access token");
        let response = self.transport.send(request)?;
        if debug {
            debug!(status = response.status, body = %response.text_lossy(), "access token result");
        }

        if response.status != 200 {
            return Err(AuthError::Status {
                status: response.status,
                message: error_message(&response),
            });
        }

        let body: TokenResponse = response.json()?;
        body.access_token
            .map(AccessToken::new)
            .ok_or(AuthError::MissingAccessToken)
    }
}
