//! Blocking HTTP access for the repository and gist commands.
//!
//! Every request asks for JSON and, when a token is given, sends it as a
//! bearer token.  Transport errors and 5xx answers are retried a few times;
//! any other non-success status is returned as [`ApiError::Status`] carrying
//! the `message` field of the body when there is one.

use std::{thread, time::Duration};

use reqwest::{
    StatusCode,
    blocking::{Client, RequestBuilder, Response},
    header::ACCEPT,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request failed with status code: {status}.{}", message_suffix(.message))]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("invalid json from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no number under `{key}` in response from {url}")]
    MissingNumber { url: String, key: String },
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" Message: {m}"))
        .unwrap_or_default()
}

/// Read-only API access.
pub trait Api {
    /// GET `url` and decode the JSON body.
    fn json(&self, url: &str, token: Option<&str>) -> Result<Value, ApiError>;

    /// GET `url` and return the raw body.
    fn text(&self, url: &str, token: Option<&str>) -> Result<String, ApiError>;
}

/// [`Api`] over reqwest's blocking client.
pub struct HttpApi {
    client: Client,
}

impl HttpApi {
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("diskput/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { client })
    }

    fn request(&self, url: &str, token: Option<&str>) -> RequestBuilder {
        let request = self.client.get(url).header(ACCEPT, "application/json");
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, url: &str, token: Option<&str>) -> Result<Response, ApiError> {
        let mut attempt = 1;
        loop {
            debug!(url, attempt, "GET");
            match self.request(url, token).send() {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if attempt < ATTEMPTS && response.status().is_server_error() => {
                    warn!(url, status = response.status().as_u16(), "retrying");
                },
                Ok(response) => return Err(status_error(response)),
                Err(e) if attempt < ATTEMPTS => warn!(url, "retrying after: {e}"),
                Err(source) => {
                    return Err(ApiError::Request {
                        url: url.to_string(),
                        source,
                    });
                },
            }
            attempt += 1;
            thread::sleep(RETRY_DELAY);
        }
    }
}

fn status_error(response: Response) -> ApiError {
    let status: StatusCode = response.status();
    let message = response
        .json::<Value>()
        .ok()
        .and_then(|body| body.get("message")?.as_str().map(str::to_owned));
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

impl Api for HttpApi {
    fn json(&self, url: &str, token: Option<&str>) -> Result<Value, ApiError> {
        self.send(url, token)?
            .json()
            .map_err(|source| ApiError::Decode {
                url: url.to_string(),
                source,
            })
    }

    fn text(&self, url: &str, token: Option<&str>) -> Result<String, ApiError> {
        self.send(url, token)?
            .text()
            .map_err(|source| ApiError::Request {
                url: url.to_string(),
                source,
            })
    }
}

/// Canned responses for command tests.
#[cfg(test)]
pub mod fake {
    use std::{cell::RefCell, collections::BTreeMap};

    use super::*;

    #[derive(Default)]
    pub struct FakeApi {
        pub json: BTreeMap<String, Value>,
        pub text: BTreeMap<String, String>,
        /// `(url, token)` of every request, in order.
        pub requests: RefCell<Vec<(String, Option<String>)>>,
    }

    impl FakeApi {
        pub fn with_json(mut self, url: &str, body: Value) -> Self {
            self.json.insert(url.to_string(), body);
            self
        }

        pub fn with_text(mut self, url: &str, body: &str) -> Self {
            self.text.insert(url.to_string(), body.to_string());
            self
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests.borrow().iter().map(|(u, _)| u.clone()).collect()
        }

        fn record(&self, url: &str, token: Option<&str>) {
            self.requests
                .borrow_mut()
                .push((url.to_string(), token.map(str::to_owned)));
        }
    }

    fn not_found() -> ApiError {
        ApiError::Status {
            status: 404,
            message: Some("Not Found".into()),
        }
    }

    impl Api for FakeApi {
        fn json(&self, url: &str, token: Option<&str>) -> Result<Value, ApiError> {
            self.record(url, token);
            self.json.get(url).cloned().ok_or_else(not_found)
        }

        fn text(&self, url: &str, token: Option<&str>) -> Result<String, ApiError> {
            self.record(url, token);
            self.text.get(url).cloned().ok_or_else(not_found)
        }
    }
}
