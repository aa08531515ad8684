//! Scripted transport and recording sleeper for client tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use super::{BitbucketClient, Endpoints};
use crate::http::{HttpRequest, HttpResponse, Sleeper, Transport, TransportError};

/// Replies with queued responses in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = HttpResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request);
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .expect("no scripted response left"))
    }
}

#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

pub type TestClient = BitbucketClient<ScriptedTransport, RecordingSleeper>;

pub fn test_client(responses: impl IntoIterator<Item = HttpResponse>) -> TestClient {
    BitbucketClient::with_parts(
        ScriptedTransport::new(responses),
        RecordingSleeper::default(),
        Endpoints::default(),
    )
}

/// Client for tests that never send a request.
pub fn offline_client() -> TestClient {
    test_client(Vec::<HttpResponse>::new())
}

pub fn json_response(status: u16, value: serde_json::Value) -> HttpResponse {
    HttpResponse::new(status, value.to_string()).with_header("Content-Type", "application/json")
}
