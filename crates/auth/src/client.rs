use config::LmsConfig;
use reqwest::{Client, StatusCode, redirect};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::AuthFailure;

/// Service identifier sent with every token request. Tokens are minted per
/// service on the remote side; this is the mobile web-service the gateway
/// speaks.
const MOBILE_SERVICE: &str = "moodle_mobile_app";

/// Client identifier presented to the remote system on every call.
const CLIENT_IDENT: &str = concat!("wicket/", env!("CARGO_PKG_VERSION"));

const MAX_REDIRECTS: usize = 10;

const TOKEN_ENDPOINT: &str = "login/token.php";
const REST_ENDPOINT: &str = "webservice/rest/server.php";

const SITE_INFO_FUNCTION: &str = "core_webservice_get_site_info";
const USERS_BY_FIELD_FUNCTION: &str = "core_user_get_users_by_field";

/// Profile of the remote account, normalized from the informational calls.
#[derive(Debug, Clone)]
pub struct RemoteProfile {
    /// Display name as recorded on the remote system.
    pub full_name: String,
    /// Email address as recorded on the remote system.
    pub email: String,
    /// The username under which the remote system knows the account.
    pub remote_username: String,
}

/// HTTP client for the remote system's mobile web-service API.
pub(crate) struct LmsClient {
    client: Client,
    base_url: String,
}

impl LmsClient {
    pub fn new(config: &LmsConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(CLIENT_IDENT)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for the remote system: {e}"))?;

        let base_url = config.base_url.as_str().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Exchange credentials for a web-service token.
    pub async fn exchange(&self, username: &str, password: &SecretString) -> Result<SecretString, AuthFailure> {
        let url = format!("{}/{TOKEN_ENDPOINT}", self.base_url);

        let params = [
            ("username", username),
            ("password", password.expose_secret()),
            ("service", MOBILE_SERVICE),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthFailure::Transport(format!("token request failed: {e}")))?;

        let status = response.status();

        if status != StatusCode::OK {
            log::warn!("Token endpoint answered {status}");
            return Err(AuthFailure::Transport(format!("token endpoint answered {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthFailure::Transport(format!("failed to read token response: {e}")))?;

        parse_token_response(&body)
    }

    /// Fetch the remote profile behind a token.
    ///
    /// Two sequential calls: the site-info call yields the remote user id
    /// and proves the token belongs to the expected account, then the
    /// user-by-field call yields the profile fields. The mismatch check runs
    /// before the second call so a foreign identity is never looked up.
    pub async fn fetch(&self, token: &SecretString, expected_username: &str) -> Result<RemoteProfile, AuthFailure> {
        let body = self
            .rest_call(token, SITE_INFO_FUNCTION, &[])
            .await?;

        let userid = parse_site_info(&body, expected_username)?;

        let values_param = userid.to_string();
        let body = self
            .rest_call(
                token,
                USERS_BY_FIELD_FUNCTION,
                &[("field", "id"), ("values[]", &values_param)],
            )
            .await?;

        parse_users_response(&body)
    }

    async fn rest_call(
        &self,
        token: &SecretString,
        function: &str,
        extra: &[(&str, &str)],
    ) -> Result<String, AuthFailure> {
        let url = format!("{}/{REST_ENDPOINT}", self.base_url);

        let mut query = vec![
            ("wstoken", token.expose_secret()),
            ("wsfunction", function),
            ("moodlewsrestformat", "json"),
        ];
        query.extend_from_slice(extra);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AuthFailure::Transport(format!("{function} request failed: {e}")))?;

        let status = response.status();

        if status != StatusCode::OK {
            log::warn!("Web-service endpoint answered {status} for {function}");
            return Err(AuthFailure::Transport(format!(
                "web-service endpoint answered {status} for {function}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AuthFailure::Transport(format!("failed to read {function} response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    error: Option<String>,
    exception: Option<String>,
    message: Option<String>,
}

fn parse_token_response(body: &str) -> Result<SecretString, AuthFailure> {
    let response: TokenResponse = sonic_rs::from_str(body).map_err(|e| {
        log::warn!("Token response did not parse as JSON: {e}");
        log::debug!("Raw token response: {body}");
        AuthFailure::MalformedResponse {
            endpoint: TOKEN_ENDPOINT,
        }
    })?;

    if let Some(token) = response.token.filter(|t| !t.is_empty()) {
        return Ok(SecretString::from(token));
    }

    if response.error.is_some() || response.exception.is_some() {
        let message = response
            .message
            .or(response.error)
            .or(response.exception)
            .unwrap_or_else(|| "no message".to_string());

        return Err(AuthFailure::RemoteRejected(message));
    }

    Err(AuthFailure::Unknown(body.to_string()))
}

#[derive(Debug, Deserialize)]
struct SiteInfoResponse {
    userid: Option<u64>,
    username: Option<String>,
    exception: Option<String>,
    message: Option<String>,
}

fn parse_site_info(body: &str, expected_username: &str) -> Result<u64, AuthFailure> {
    let response: SiteInfoResponse = sonic_rs::from_str(body).map_err(|e| {
        log::warn!("Site-info response did not parse as JSON: {e}");
        log::debug!("Raw site-info response: {body}");
        AuthFailure::MalformedResponse {
            endpoint: REST_ENDPOINT,
        }
    })?;

    if response.exception.is_some() {
        let message = response.message.unwrap_or_else(|| "no message".to_string());
        return Err(AuthFailure::RemoteRejected(message));
    }

    let userid = response.userid.filter(|id| *id != 0);
    let username = response.username.filter(|name| !name.is_empty());

    match (userid, username) {
        (Some(userid), Some(username)) if username.to_lowercase() == expected_username.to_lowercase() => Ok(userid),
        _ => Err(AuthFailure::IdentityMismatch {
            expected: expected_username.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    fullname: Option<String>,
    email: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebServiceException {
    exception: Option<String>,
    message: Option<String>,
}

fn parse_users_response(body: &str) -> Result<RemoteProfile, AuthFailure> {
    let malformed = || {
        log::debug!("Raw user lookup response: {body}");
        AuthFailure::MalformedResponse {
            endpoint: REST_ENDPOINT,
        }
    };

    let records: Vec<UserRecord> = match sonic_rs::from_str(body) {
        Ok(records) => records,
        Err(_) => {
            // The endpoint reports failures as an object instead of the
            // usual array.
            if let Ok(error) = sonic_rs::from_str::<WebServiceException>(body)
                && error.exception.is_some()
            {
                let message = error.message.unwrap_or_else(|| "no message".to_string());
                return Err(AuthFailure::RemoteRejected(message));
            }

            return Err(malformed());
        }
    };

    let Some(record) = records.into_iter().next() else {
        return Err(malformed());
    };

    match (record.fullname, record.email, record.username) {
        (Some(full_name), Some(email), Some(remote_username)) => Ok(RemoteProfile {
            full_name,
            email,
            remote_username,
        }),
        _ => Err(malformed()),
    }
}
