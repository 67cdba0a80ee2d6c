// Request pipeline
//
// Every CRUD call goes through `SmcRequest::execute`: resolve the href
// against the session's API root, attach the session token and concurrency
// token, send, then normalize the HTTP outcome into either an `SmcResult`
// or one of the raised error kinds. Only reads are ever retried.

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, ETAG, IF_MATCH, LOCATION};
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::SESSION_HEADER;
use crate::error::Error;
use crate::result::{Content, SmcResult, diagnostic};
use crate::session::Session;
use crate::transport::RetryPolicy;
use crate::types::{Etag, Href};

/// Which pipeline operation a request performs.
///
/// Drives retry eligibility and how non-2xx statuses are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Invoke,
}

impl Operation {
    fn is_mutation_with_token(self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }
}

/// A single request to the management server.
///
/// Build with the setters, then finish with one of the operation methods.
#[derive(Debug, Clone)]
pub struct SmcRequest {
    href: Href,
    body: Option<Value>,
    params: Vec<(String, String)>,
    etag: Option<Etag>,
}

impl SmcRequest {
    pub fn new(href: impl Into<Href>) -> Self {
        Self {
            href: href.into(),
            body: None,
            params: Vec::new(),
            etag: None,
        }
    }

    /// JSON body to send.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append one query string parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Append query string parameters.
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn href(&self) -> &Href {
        &self.href
    }

    // ── Operations ───────────────────────────────────────────────────

    /// `POST` a new resource to a collection href.
    pub async fn create(self, session: &Session) -> Result<SmcResult, Error> {
        self.execute(session, Operation::Create, Method::POST).await
    }

    /// `GET` a resource or listing. Retried on transient failure.
    pub async fn read(self, session: &Session) -> Result<SmcResult, Error> {
        self.execute(session, Operation::Read, Method::GET).await
    }

    /// `PUT` a full representation guarded by `etag`.
    pub async fn update(mut self, session: &Session, etag: &Etag) -> Result<SmcResult, Error> {
        self.etag = Some(etag.clone());
        self.execute(session, Operation::Update, Method::PUT).await
    }

    /// `DELETE` a resource guarded by `etag`.
    pub async fn delete(mut self, session: &Session, etag: &Etag) -> Result<SmcResult, Error> {
        self.etag = Some(etag.clone());
        self.execute(session, Operation::Delete, Method::DELETE).await
    }

    /// Non-CRUD action, usually `POST` to an action sub-href.
    pub async fn invoke(self, session: &Session, method: Method) -> Result<SmcResult, Error> {
        self.execute(session, Operation::Invoke, method).await
    }

    // ── Pipeline ─────────────────────────────────────────────────────

    async fn execute(
        &self,
        session: &Session,
        op: Operation,
        method: Method,
    ) -> Result<SmcResult, Error> {
        let active = session.active()?;
        let url = self.href.to_url(&active.api_root)?;
        let retry = if op == Operation::Read {
            session.config().transport.retry
        } else {
            RetryPolicy::disabled()
        };

        let mut attempt = 0;
        loop {
            let outcome = self
                .send_once(session, active.token.as_deref(), &method, url.clone())
                .await;
            let retryable = match &outcome {
                Ok(resp) => resp.status().is_server_error(),
                Err(e) => e.is_transient(),
            };
            if retryable && attempt < retry.max_retries {
                attempt += 1;
                let delay = retry.delay(attempt);
                warn!(%method, href = %self.href, attempt, ?delay, "transient failure, retrying read");
                tokio::time::sleep(delay).await;
                continue;
            }
            return self.normalize(op, &method, outcome?).await;
        }
    }

    async fn send_once(
        &self,
        session: &Session,
        token: Option<&str>,
        method: &Method,
        url: Url,
    ) -> Result<reqwest::Response, Error> {
        debug!("{method} {url}");

        let mut builder = session.http().request(method.clone(), url);
        if let Some(token) = token {
            builder = builder.header(SESSION_HEADER, token);
        }
        if let Some(ref etag) = self.etag {
            builder = builder.header(IF_MATCH, etag.as_str());
        }
        if !self.params.is_empty() {
            builder = builder.query(&self.params);
        }
        if let Some(ref body) = self.body {
            builder = builder.json(body);
        }

        builder
            .send()
            .await
            .map_err(|e| Error::transport(method.clone(), self.href.clone(), e))
    }

    /// Turn a raw response into an envelope or a raised error.
    async fn normalize(
        &self,
        op: Operation,
        method: &Method,
        resp: reqwest::Response,
    ) -> Result<SmcResult, Error> {
        let status = resp.status();
        let code = status.as_u16();
        let headers = resp.headers();
        let etag = header_str(headers, &ETAG).map(Etag::new);
        let location = header_str(headers, &LOCATION).map(Href::new);
        let is_json = header_str(headers, &CONTENT_TYPE).is_some_and(|ct| ct.contains("json"));

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::transport(method.clone(), self.href.clone(), e))?;
        let content = decode_body(&self.href, &bytes, is_json, status.is_success())?;

        if status.is_success() {
            trace!(%method, href = %self.href, code, "request succeeded");
            let href = match op {
                Operation::Create => location.or_else(|| embedded_href(&content)),
                _ => location.or_else(|| Some(self.href.clone())),
            };
            return Ok(SmcResult {
                success: true,
                status: code,
                href,
                etag,
                content,
                message: None,
            });
        }

        let message = diagnostic(&content, code);
        match code {
            401 | 403 => Err(Error::Authentication {
                message: format!("HTTP {code} on {method} {}: {message}", self.href),
            }),
            404 => Err(Error::ResourceNotFound {
                href: self.href.clone(),
            }),
            409 | 412 if op.is_mutation_with_token() => Err(Error::ResourceConflict {
                href: self.href.clone(),
                status: code,
                message,
            }),
            _ => {
                debug!(%method, href = %self.href, code, %message, "request failed");
                Ok(SmcResult {
                    success: false,
                    status: code,
                    href: Some(self.href.clone()),
                    etag,
                    content,
                    message: Some(message),
                })
            }
        }
    }
}

fn header_str<'a>(
    headers: &'a reqwest::header::HeaderMap,
    name: &reqwest::header::HeaderName,
) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn embedded_href(content: &Content) -> Option<Href> {
    content
        .as_json()?
        .get("href")
        .and_then(Value::as_str)
        .map(Href::from)
}

/// Decode a body as UTF-8, then JSON when it is (or claims to be) JSON.
///
/// Undecodable success bodies are errors; undecodable failure bodies are
/// kept as lossy text so the diagnostic survives.
fn decode_body(href: &Href, bytes: &[u8], is_json: bool, success: bool) -> Result<Content, Error> {
    if bytes.is_empty() {
        return Ok(Content::Empty);
    }

    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) if success => {
            return Err(Error::Decode {
                href: href.clone(),
                message: format!("body is not valid UTF-8: {e}"),
                body: String::from_utf8_lossy(bytes).into_owned(),
            });
        }
        Err(_) => return Ok(Content::Text(String::from_utf8_lossy(bytes).into_owned())),
    };

    let looks_json = text.trim_start().starts_with(['{', '[']);
    if !is_json && !looks_json {
        return Ok(Content::Text(text.to_owned()));
    }

    match serde_json::from_str(text) {
        Ok(value) => Ok(Content::Json(value)),
        Err(e) if success && is_json => {
            let preview = text.chars().take(200).collect::<String>();
            Err(Error::Decode {
                href: href.clone(),
                message: format!("{e} (body preview: {preview:?})"),
                body: text.to_owned(),
            })
        }
        Err(_) => Ok(Content::Text(text.to_owned())),
    }
}

// ── Session shortcuts ────────────────────────────────────────────────

impl Session {
    /// Create a resource in the collection at `href`.
    pub async fn create(&self, href: &Href, body: Value) -> Result<SmcResult, Error> {
        SmcRequest::new(href.clone()).json(body).create(self).await
    }

    /// Read the resource at `href`.
    pub async fn read(&self, href: &Href) -> Result<SmcResult, Error> {
        SmcRequest::new(href.clone()).read(self).await
    }

    /// Read with query parameters (listings and filters).
    pub async fn read_with_params(
        &self,
        href: &Href,
        params: &[(&str, String)],
    ) -> Result<SmcResult, Error> {
        SmcRequest::new(href.clone())
            .params(params.iter().map(|(k, v)| (*k, v.clone())))
            .read(self)
            .await
    }

    /// Replace the resource at `href`, guarded by its last-seen `etag`.
    pub async fn update(&self, href: &Href, body: Value, etag: &Etag) -> Result<SmcResult, Error> {
        SmcRequest::new(href.clone())
            .json(body)
            .update(self, etag)
            .await
    }

    /// Delete the resource at `href`, guarded by its last-seen `etag`.
    pub async fn delete(&self, href: &Href, etag: &Etag) -> Result<SmcResult, Error> {
        SmcRequest::new(href.clone()).delete(self, etag).await
    }

    /// Run a non-CRUD action against `href`.
    pub async fn invoke(
        &self,
        href: &Href,
        method: Method,
        body: Option<Value>,
        query: &[(&str, String)],
    ) -> Result<SmcResult, Error> {
        let mut request =
            SmcRequest::new(href.clone()).params(query.iter().map(|(k, v)| (*k, v.clone())));
        if let Some(body) = body {
            request = request.json(body);
        }
        request.invoke(self, method).await
    }
}
