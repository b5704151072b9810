//! Membership change report download.
//!
//! Logs into the membership system with a form post, keeps the `JSESSIONID`
//! session cookie and requests the CSV export for a date range.
//!
//! ```rust,ignore
//! let credentials = Credentials::new(Some("desk"), Some("secret"))?;
//! let fetcher = ReportFetcher::new("capitolhill.myturn.com", credentials, timezone)?;
//! let records = fetcher.fetch_records(start, end).await?;
//! ```

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::{HeaderMap, COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::Url;
use report_core::error::{ReportError, Result};
use report_core::models::TransactionRecord;
use report_core::time_utils::{format_report_date, TimezoneHandler};
use tracing::{debug, info};

use crate::reader::parse_records_str;

const LOGIN_PATH: &str = "/library/j_spring_security_check";
const EXPORT_PATH: &str = "/library/orgMembership/exportMembershipChangeReport";
const SESSION_COOKIE: &str = "JSESSIONID";
const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Resolves relative `Location` headers; only path and query are read.
const RELATIVE_BASE: &str = "http://localhost/";

// ── Credentials ───────────────────────────────────────────────────────────────

/// Login for the membership system.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Both values must be present and non-empty.
    pub fn new(username: Option<&str>, password: Option<&str>) -> Result<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok(Self {
                username: u.to_string(),
                password: p.to_string(),
            }),
            _ => Err(ReportError::Authentication(
                "MYTURN_USERNAME and MYTURN_PASSWORD must be set".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// ── ReportFetcher ─────────────────────────────────────────────────────────────

/// HTTP client for the membership change report.
#[derive(Debug, Clone)]
pub struct ReportFetcher {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    timezone: TimezoneHandler,
}

impl ReportFetcher {
    /// Client for `https://{host}`.
    pub fn new(host: &str, credentials: Credentials, timezone: TimezoneHandler) -> Result<Self> {
        Self::with_base_url(format!("https://{host}"), credentials, timezone)
    }

    /// Client for an explicit base URL (scheme and authority, no trailing path).
    pub fn with_base_url(
        base_url: impl Into<String>,
        credentials: Credentials,
        timezone: TimezoneHandler,
    ) -> Result<Self> {
        // Redirects are inspected, not followed: the login answers with one.
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            timezone,
        })
    }

    /// Download and parse the report for the inclusive day range.
    pub async fn fetch_records(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TransactionRecord>> {
        let cookie = self.login().await?;
        let body = self.download_csv(&cookie, start, end).await?;
        let records = parse_records_str(&body)?;
        info!(
            records = records.len(),
            from = %start,
            to = %end,
            "fetched membership change report"
        );
        Ok(records)
    }

    /// Log in and return the session cookie pair (`JSESSIONID=...`).
    pub async fn login(&self) -> Result<String> {
        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        debug!(url = %url, "logging in");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("j_username", self.credentials.username.as_str()),
                ("j_password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ReportError::Network(format!("login request failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ReportError::Network(format!("login failed with HTTP {status}")));
        }
        if status.is_redirection() && redirects_back_to_login(response.headers()) {
            return Err(ReportError::Authentication(
                "credentials were rejected".to_string(),
            ));
        }

        extract_session_cookie(response.headers()).ok_or_else(|| {
            ReportError::Authentication(format!("no {SESSION_COOKIE} cookie in login response"))
        })
    }

    /// Request the CSV export with an established session.
    pub async fn download_csv(
        &self,
        cookie: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<String> {
        let url = format!("{}{}", self.base_url, EXPORT_PATH);
        let form = export_form(start, end, self.timezone.name());
        debug!(url = %url, from = %start, to = %end, "requesting export");

        let response = self
            .client
            .post(&url)
            .header(COOKIE, cookie)
            .form(&form)
            .send()
            .await
            .map_err(|e| ReportError::Network(format!("export request failed: {e}")))?;

        let status = response.status();
        if status.is_redirection() {
            // An expired or anonymous session is bounced to the login page.
            return Err(ReportError::Authentication(format!(
                "session was not accepted (HTTP {status})"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Network(format!(
                "export failed with HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ReportError::Network(format!("failed to read export body: {e}")))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Form fields of the export request for `[start 00:00, end 23:59:59.999]`.
fn export_form(start: NaiveDate, end: NaiveDate, tz_name: &str) -> Vec<(&'static str, String)> {
    vec![
        ("from", "struct".to_string()),
        ("from_date", format_report_date(start)),
        ("from_tz", tz_name.to_string()),
        ("from_time", "00:00".to_string()),
        ("to", "struct".to_string()),
        ("to_date", format_report_date(end)),
        ("to_tz", tz_name.to_string()),
        ("to_time", "23:59:59.999".to_string()),
        ("type", "0".to_string()),
        ("format", "csv".to_string()),
        ("extension", "csv".to_string()),
    ]
}

/// First `JSESSIONID=...` pair found in any `Set-Cookie` header.
fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .find(|part| {
            part.split_once('=')
                .is_some_and(|(name, value)| name == SESSION_COOKIE && !value.is_empty())
        })
        .map(str::to_string)
}

/// Spring Security sends failed logins back to the login form, usually with
/// an `error` parameter.  Only the last path segment and the query names are
/// inspected; `Location` may be relative.
fn redirects_back_to_login(headers: &HeaderMap) -> bool {
    let Some(location) = headers.get(LOCATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Ok(url) = Url::parse(location)
        .or_else(|_| Url::parse(RELATIVE_BASE).and_then(|base| base.join(location)))
    else {
        return false;
    };

    let login_form = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .is_some_and(|last| last == "login" || last.starts_with("login."));
    let error_param = url
        .query_pairs()
        .any(|(name, _)| name == "error" || name == "login_error");

    login_form || error_param
}

// ── Tests ─────────────────────────────────────────────────────────────────────
