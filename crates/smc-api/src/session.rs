// Transport session
//
// Owns the HTTP client and the authenticated state: negotiated API version,
// session token and the entry-point map advertised after login. The session
// is an explicit object handed to every pipeline call; a process-wide
// default slot exists for callers that only ever talk to one server.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwapOption;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Credential, SESSION_HEADER};
use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{ApiVersion, Href, negotiate_version};

// ── Wire shapes ──────────────────────────────────────────────────────

/// `{"rel": "...", "href": "..."}` pair used by both `/api` documents.
#[derive(Debug, Deserialize)]
struct RelLink {
    rel: String,
    href: Href,
}

#[derive(Debug, Deserialize)]
struct VersionDocument {
    #[serde(default)]
    version: Vec<RelLink>,
}

#[derive(Debug, Deserialize)]
struct EntryPointDocument {
    #[serde(default)]
    entry_point: Vec<RelLink>,
}

// ── Configuration ────────────────────────────────────────────────────

/// Everything needed to reach a server, minus the credential.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server root, e.g. `https://smc.example.com:8082`.
    pub url: Url,
    /// Require this exact API version instead of negotiating the highest.
    pub api_version: Option<ApiVersion>,
    /// Timeout, TLS and retry settings.
    pub transport: TransportConfig,
}

impl SessionConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            api_version: None,
            transport: TransportConfig::default(),
        }
    }
}

// ── Active state ─────────────────────────────────────────────────────

/// State that exists only between a successful login and logout.
#[derive(Debug)]
pub(crate) struct ActiveSession {
    pub(crate) version: ApiVersion,
    /// `{url}/{version}/` -- relative hrefs resolve against this.
    pub(crate) api_root: Url,
    pub(crate) token: Option<String>,
    entry_points: HashMap<String, Href>,
}

// ── Session ──────────────────────────────────────────────────────────

/// An authenticated connection to one management server.
pub struct Session {
    http: reqwest::Client,
    config: SessionConfig,
    active: RwLock<Option<Arc<ActiveSession>>>,
}

impl Session {
    /// Build the HTTP client. No network I/O happens until [`login`](Self::login).
    pub fn new(mut config: SessionConfig) -> Result<Self, Error> {
        if !config.url.path().ends_with('/') {
            let path = format!("{}/", config.url.path());
            config.url.set_path(&path);
        }
        let transport = if config.transport.cookie_jar.is_some() {
            config.transport.clone()
        } else {
            config.transport.clone().with_cookie_jar()
        };
        let http = transport.build_client()?;
        Ok(Self {
            http,
            config,
            active: RwLock::new(None),
        })
    }

    /// Build a session and log in with it.
    pub async fn connect(config: SessionConfig, credential: &Credential) -> Result<Arc<Self>, Error> {
        let session = Arc::new(Self::new(config)?);
        session.login(credential).await?;
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn is_logged_in(&self) -> bool {
        self.read_active().is_some()
    }

    /// The negotiated API version, while logged in.
    pub fn api_version(&self) -> Option<ApiVersion> {
        self.read_active().map(|a| a.version)
    }

    /// Root URL for versioned API paths, while logged in.
    pub fn api_root(&self) -> Result<Url, Error> {
        Ok(self.active()?.api_root.clone())
    }

    pub(crate) fn active(&self) -> Result<Arc<ActiveSession>, Error> {
        self.read_active().ok_or(Error::NotLoggedIn)
    }

    fn read_active(&self) -> Option<Arc<ActiveSession>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_active(&self, state: Option<ActiveSession>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = state.map(Arc::new);
    }

    // ── Login / logout ───────────────────────────────────────────────

    /// Versions the server advertises at `{url}/api`.
    pub async fn server_versions(&self) -> Result<Vec<ApiVersion>, Error> {
        let url = self.config.url.join("api")?;
        debug!("GET {url}");

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::transport(reqwest::Method::GET, url.clone().into(), e))?;
        let doc: VersionDocument = decode_json(resp, &url).await?;

        Ok(doc
            .version
            .iter()
            .filter_map(|v| match v.rel.parse::<ApiVersion>() {
                Ok(version) => Some(version),
                Err(e) => {
                    debug!("ignoring advertised version: {e}");
                    None
                }
            })
            .collect())
    }

    /// Negotiate a version, authenticate and load the entry-point map.
    ///
    /// Replaces any session that was already active.
    pub async fn login(&self, credential: &Credential) -> Result<ApiVersion, Error> {
        let offered = self.server_versions().await?;
        let version = negotiate_version(&offered, self.config.api_version)?;
        let api_root = self.config.url.join(&format!("{version}/"))?;

        let login_url = api_root.join("login")?;
        debug!("logging in at {login_url}");

        let resp = self
            .http
            .post(login_url.clone())
            .json(&credential.login_body())
            .send()
            .await
            .map_err(|e| Error::transport(reqwest::Method::POST, login_url.into(), e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {}", body.trim()),
            });
        }

        let token = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let entry_url = api_root.join("api")?;
        debug!("GET {entry_url}");
        let mut request = self.http.get(entry_url.clone());
        if let Some(ref token) = token {
            request = request.header(SESSION_HEADER, token);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| Error::transport(reqwest::Method::GET, entry_url.clone().into(), e))?;
        let doc: EntryPointDocument = decode_json(resp, &entry_url).await?;
        let entry_points: HashMap<String, Href> =
            doc.entry_point.into_iter().map(|e| (e.rel, e.href)).collect();

        info!(%version, entry_points = entry_points.len(), "login successful");
        self.set_active(Some(ActiveSession {
            version,
            api_root,
            token,
            entry_points,
        }));
        Ok(version)
    }

    /// End the server-side session and clear local state.
    ///
    /// Local state is cleared even when the logout request fails.
    pub async fn logout(&self) -> Result<(), Error> {
        let active = self.active()?;
        self.set_active(None);

        let url = active.api_root.join("logout")?;
        debug!("logging out at {url}");

        let mut request = self.http.put(url.clone());
        if let Some(ref token) = active.token {
            request = request.header(SESSION_HEADER, token);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| Error::transport(reqwest::Method::PUT, url.into(), e))?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "server rejected logout; local session cleared anyway");
        }
        debug!("logout complete");
        Ok(())
    }

    // ── Entry points ─────────────────────────────────────────────────

    /// Collection href for a kind, as advertised after login.
    pub fn entry_point(&self, rel: &str) -> Result<Href, Error> {
        self.active()?
            .entry_points
            .get(rel)
            .cloned()
            .ok_or_else(|| Error::UnsupportedEntryPoint(rel.to_owned()))
    }

    /// Names of every advertised entry point, sorted.
    pub fn entry_point_names(&self) -> Result<Vec<String>, Error> {
        let mut names: Vec<String> = self.active()?.entry_points.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.config.url.as_str())
            .field("api_version", &self.api_version())
            .finish_non_exhaustive()
    }
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    url: &Url,
) -> Result<T, Error> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::Authentication {
            message: format!("HTTP {status} from {url}"),
        });
    }
    let body = resp
        .text()
        .await
        .map_err(|e| Error::transport(reqwest::Method::GET, url.clone().into(), e))?;
    if !status.is_success() {
        return Err(Error::Decode {
            href: url.clone().into(),
            message: format!("unexpected HTTP {status}"),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| {
        let preview = body.chars().take(200).collect::<String>();
        Error::Decode {
            href: url.clone().into(),
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

// ── Default session ──────────────────────────────────────────────────

static DEFAULT_SESSION: ArcSwapOption<Session> = ArcSwapOption::const_empty();

/// Install `session` as the process-wide default.
pub fn set_default_session(session: Arc<Session>) {
    DEFAULT_SESSION.store(Some(session));
}

/// The process-wide default session, if one is installed and logged in.
pub fn default_session() -> Result<Arc<Session>, Error> {
    DEFAULT_SESSION
        .load_full()
        .filter(|s| s.is_logged_in())
        .ok_or(Error::NotLoggedIn)
}

/// Remove the process-wide default session.
pub fn clear_default_session() {
    DEFAULT_SESSION.store(None);
}
