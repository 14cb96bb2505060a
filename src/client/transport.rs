//! Resilient HTTP transport for client operations.
//!
//! Each request is delivered over a fixed sequence of waits. Only a
//! refused connection (the server is not up yet) triggers another
//! attempt; every other failure is returned as is. Responses are mapped
//! onto the client error taxonomy by [`check_status`].

use std::io::{self, Write};
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;
use ureq::http::header::{CONTENT_ENCODING, CONTENT_TYPE, COOKIE, SET_COOKIE};

use super::cancel::CancelFlag;
use super::session::Session;
use crate::config::ClientSettings;
use crate::errors::{KeeperError, Result};

/// Largest response body the client accepts.
const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Ordered waits before each delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    intervals: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(vec![
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_secs(3),
            Duration::from_secs(5),
        ])
    }
}

impl RetryPolicy {
    /// One attempt per interval. An empty list still makes one immediate
    /// attempt.
    pub fn new(intervals: Vec<Duration>) -> Self {
        if intervals.is_empty() {
            return Self {
                intervals: vec![Duration::ZERO],
            };
        }
        Self { intervals }
    }

    pub fn attempts(&self) -> usize {
        self.intervals.len()
    }

    pub fn intervals(&self) -> &[Duration] {
        &self.intervals
    }

    /// Run `attempt` until it succeeds, fails with anything other than
    /// `ConnectionRefused`, or the intervals run out.
    ///
    /// `attempt` receives the zero-based attempt number. Cancellation
    /// during a wait yields `Interrupted`.
    pub fn run<T>(
        &self,
        cancel: &CancelFlag,
        mut attempt: impl FnMut(usize) -> Result<T>,
    ) -> Result<T> {
        let mut last = KeeperError::ConnectionRefused;

        for (n, wait) in self.intervals.iter().enumerate() {
            if !cancel.sleep(*wait) {
                return Err(KeeperError::Interrupted);
            }
            match attempt(n) {
                Err(KeeperError::ConnectionRefused) => {
                    debug!(attempt = n + 1, of = self.attempts(), "connection refused");
                    last = KeeperError::ConnectionRefused;
                }
                other => return other,
            }
        }

        Err(last)
    }
}

// ---------------------------------------------------------------------------
// Status mapping
// ---------------------------------------------------------------------------

/// Translate a response status into the client outcome.
///
/// 204 means the server found nothing for the key.
pub fn check_status(status: u16) -> Result<()> {
    match status {
        200 => Ok(()),
        400 => Err(KeeperError::BadRequest),
        401 => Err(KeeperError::Unauthorized),
        409 => Err(KeeperError::AlreadyExists),
        413 => Err(KeeperError::TooLarge),
        204 => Err(KeeperError::NotFound),
        500 => Err(KeeperError::ServerInternal),
        other => Err(KeeperError::UnknownStatus(other)),
    }
}

// ---------------------------------------------------------------------------
// Requests and replies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A prepared request, replayable across attempts.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<(String, Vec<u8>)>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        self.body = Some((content_type.into(), body));
        self
    }
}

/// A successful (200) response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub content_type: Option<String>,
    pub set_cookies: Vec<String>,
    pub body: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub struct Transport {
    agent: ureq::Agent,
    base_url: String,
    retry: RetryPolicy,
    gzip: bool,
}

impl Transport {
    pub fn new(base_url: impl Into<String>, retry: RetryPolicy, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: config.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
            gzip: false,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::new(
            settings.address.clone(),
            RetryPolicy::new(settings.retry_intervals()),
            settings.request_timeout(),
        )
        .with_gzip(settings.gzip)
    }

    /// Compress request bodies with gzip.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Deliver `request` with retries and map the status.
    pub fn send(&self, request: &Request, session: &Session, cancel: &CancelFlag) -> Result<Reply> {
        let body = match &request.body {
            Some((content_type, bytes)) if self.gzip => {
                Some((content_type.as_str(), gzip(bytes)?))
            }
            Some((content_type, bytes)) => Some((content_type.as_str(), bytes.clone())),
            None => None,
        };

        let (status, reply) = self
            .retry
            .run(cancel, |_| self.attempt(request, body.as_ref(), session))?;
        check_status(status)?;
        Ok(reply)
    }

    fn attempt(
        &self,
        request: &Request,
        body: Option<&(&str, Vec<u8>)>,
        session: &Session,
    ) -> Result<(u16, Reply)> {
        let url = format!("{}{}", self.base_url, request.path);

        let result = match request.method {
            Method::Get => self.decorate(self.agent.get(&url), session, None).call(),
            Method::Delete => self.decorate(self.agent.delete(&url), session, None).call(),
            Method::Post | Method::Put => {
                let builder = if request.method == Method::Post {
                    self.agent.post(&url)
                } else {
                    self.agent.put(&url)
                };
                match body {
                    Some((content_type, bytes)) => self
                        .decorate(builder, session, Some(*content_type))
                        .send(&bytes[..]),
                    None => self.decorate(builder, session, None).send_empty(),
                }
            }
        };

        let mut response = result.map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let set_cookies = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_vec()
            .map_err(classify)?;

        Ok((
            status,
            Reply {
                content_type,
                set_cookies,
                body,
            },
        ))
    }

    fn decorate<B>(
        &self,
        mut builder: ureq::RequestBuilder<B>,
        session: &Session,
        content_type: Option<&str>,
    ) -> ureq::RequestBuilder<B> {
        if let Some(cookie) = session.cookie_header() {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
            if self.gzip {
                builder = builder.header(CONTENT_ENCODING, "gzip");
            }
        }
        builder
    }
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Map a client error, singling out refused connections.
fn classify(err: ureq::Error) -> KeeperError {
    if let ureq::Error::Io(ref io) = err {
        if io.kind() == io::ErrorKind::ConnectionRefused {
            return KeeperError::ConnectionRefused;
        }
    }
    if is_connection_refused(&err) {
        return KeeperError::ConnectionRefused;
    }
    KeeperError::Transport(err.to_string())
}

fn is_connection_refused(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<io::Error>() {
            if io.kind() == io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        current = e.source();
    }
    false
}
