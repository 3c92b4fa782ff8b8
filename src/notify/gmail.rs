//! Mail delivery through the Gmail API using an installed-app OAuth token.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::{Duration, Utc};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::token::{ClientSecrets, StoredToken, TokenStore};
use super::{Mailer, OutgoingMessage, SentMessage};
use crate::fetch::HttpClient;
use crate::fetch::auth::Bearer;

/// Permission to send mail, and nothing else.
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

const SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    raw: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Sends mail as the authorized Gmail account.
///
/// The access token is read from the [`TokenStore`] on every send and
/// refreshed (then saved back) when it has expired.
pub struct GmailMailer<C, S> {
    client: C,
    store: S,
    send_url: String,
}

impl<C: HttpClient, S: TokenStore> GmailMailer<C, S> {
    pub fn new(client: C, store: S) -> Self {
        Self {
            client,
            store,
            send_url: SEND_URL.to_string(),
        }
    }

    /// Point at a different send endpoint (for testing).
    pub fn with_send_url(mut self, url: impl Into<String>) -> Self {
        self.send_url = url.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn access_token(&self) -> Result<String> {
        let token = self.store.load()?.ok_or_else(|| {
            anyhow::anyhow!("no stored Gmail credentials; run `dock_alert authorize` first")
        })?;

        if token.is_fresh(Utc::now()) {
            return Ok(token.token);
        }

        debug!("Access token expired, refreshing");
        let refreshed = refresh(&self.client, &token).await?;
        self.store.save(&refreshed)?;
        Ok(refreshed.token)
    }
}

#[async_trait]
impl<C: HttpClient, S: TokenStore> Mailer for GmailMailer<C, S> {
    async fn send(&self, message: &OutgoingMessage) -> Result<SentMessage> {
        let token = self.access_token().await?;
        let raw = URL_SAFE.encode(message.to_rfc5322());
        let req = json_request(&self.send_url, &SendRequest { raw: &raw })?;

        let resp = Bearer::new(&self.client, &token)?
            .execute(req)
            .await
            .context("failed to reach the Gmail API")?;
        let body = success_body(resp, "Gmail API").await?;

        let sent: SendResponse =
            serde_json::from_str(&body).context("failed to parse Gmail send response")?;
        Ok(SentMessage { id: sent.id })
    }
}

/// Trades a refresh token for a new access token.
async fn refresh<C: HttpClient>(client: &C, token: &StoredToken) -> Result<StoredToken> {
    let refresh_token = token.refresh_token.as_deref().ok_or_else(|| {
        anyhow::anyhow!("stored credentials cannot be refreshed; run `dock_alert authorize` again")
    })?;

    let req = form_request(
        &token.token_uri,
        &[
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
    )?;
    let resp = request_token(client, req).await?;

    Ok(StoredToken {
        token: resp.access_token,
        refresh_token: resp.refresh_token.or_else(|| token.refresh_token.clone()),
        token_uri: token.token_uri.clone(),
        client_id: token.client_id.clone(),
        client_secret: token.client_secret.clone(),
        scopes: resp
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| token.scopes.clone()),
        expiry: resp.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
    })
}

/// Builds the consent page URL the user opens to authorize sending mail.
pub fn authorization_url(secrets: &ClientSecrets) -> Result<String> {
    let url = reqwest::Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", secrets.redirect_uri()),
            ("response_type", "code"),
            ("scope", GMAIL_SEND_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .with_context(|| format!("invalid auth_uri '{}'", secrets.auth_uri))?;
    Ok(url.into())
}

/// Completes first-time authorization.
///
/// `input` is either the bare authorization code or the whole URL the
/// browser was redirected to.
#[tracing::instrument(skip_all)]
pub async fn exchange_code<C: HttpClient>(
    client: &C,
    secrets: &ClientSecrets,
    input: &str,
) -> Result<StoredToken> {
    let code = extract_code(input)?;
    let req = form_request(
        &secrets.token_uri,
        &[
            ("code", code.as_str()),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("redirect_uri", secrets.redirect_uri()),
            ("grant_type", "authorization_code"),
        ],
    )?;
    let resp = request_token(client, req).await?;

    if resp.refresh_token.is_none() {
        anyhow::bail!("token endpoint did not return a refresh token");
    }
    info!("Authorization code exchanged");

    Ok(StoredToken {
        token: resp.access_token,
        refresh_token: resp.refresh_token,
        token_uri: secrets.token_uri.clone(),
        client_id: secrets.client_id.clone(),
        client_secret: secrets.client_secret.clone(),
        scopes: vec![GMAIL_SEND_SCOPE.to_string()],
        expiry: resp.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
    })
}

fn extract_code(input: &str) -> Result<String> {
    let input = input.trim();
    if let Ok(url) = reqwest::Url::parse(input) {
        return url
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned())
            .ok_or_else(|| anyhow::anyhow!("redirect URL has no 'code' parameter"));
    }
    if input.is_empty() {
        anyhow::bail!("no authorization code given");
    }
    Ok(input.to_string())
}

async fn request_token<C: HttpClient>(client: &C, req: Request) -> Result<TokenResponse> {
    let resp = client
        .execute(req)
        .await
        .context("failed to send token request")?;
    let body = success_body(resp, "Token endpoint").await?;
    serde_json::from_str(&body).context("failed to parse token response")
}

async fn success_body(resp: Response, what: &str) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("{what} returned status {status}: {body}");
    }
    Ok(body)
}

fn json_request<T: Serialize>(url: &str, payload: &T) -> Result<Request> {
    let mut req = Request::new(Method::POST, url.parse()?);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(payload)?.into());
    Ok(req)
}

fn form_request(url: &str, fields: &[(&str, &str)]) -> Result<Request> {
    // Borrow the URL query serializer for application/x-www-form-urlencoded.
    let mut encoder = reqwest::Url::parse("http://localhost/")?;
    encoder.query_pairs_mut().extend_pairs(fields);
    let body = encoder.query().unwrap_or_default().to_string();

    let mut req = Request::new(
        Method::POST,
        url.parse()
            .with_context(|| format!("invalid token URI '{url}'"))?,
    );
    req.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    *req.body_mut() = Some(body.into());
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubClient;
    use crate::notify::token::{DEFAULT_TOKEN_URI, MemoryTokenStore};

    const SEND: &str = "https://gmail.example.com/send";

    fn stored(expiry_offset_mins: i64) -> StoredToken {
        StoredToken {
            token: "old-access".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            scopes: vec![GMAIL_SEND_SCOPE.to_string()],
            expiry: Some(Utc::now() + Duration::minutes(expiry_offset_mins)),
        }
    }

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            to: "rider@example.com".to_string(),
            subject: "Dock update".to_string(),
            body: "Empty Docks: 3".to_string(),
        }
    }

    fn secrets() -> ClientSecrets {
        ClientSecrets::from_json(
            r#"{"installed":{"client_id":"cid","client_secret":"csecret",
                "redirect_uris":["http://localhost"]}}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_with_fresh_token() {
        let client = StubClient::new().with_response(SEND, 200, r#"{"id":"abc"}"#);
        let store = MemoryTokenStore::new(Some(stored(30)));
        let mailer = GmailMailer::new(client, store).with_send_url(SEND);

        let sent = mailer.send(&message()).await.unwrap();
        assert_eq!(sent.id.as_deref(), Some("abc"));

        let requests = mailer.client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer old-access"));

        let payload: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let raw = URL_SAFE.decode(payload["raw"].as_str().unwrap()).unwrap();
        let raw = String::from_utf8(raw).unwrap();
        assert!(raw.contains("To: rider@example.com\r\n"));
        assert!(raw.contains("Empty Docks: 3"));
    }

    #[tokio::test]
    async fn test_send_refreshes_expired_token() {
        let client = StubClient::new()
            .with_response(
                DEFAULT_TOKEN_URI,
                200,
                r#"{"access_token":"new-access","expires_in":3599,"token_type":"Bearer"}"#,
            )
            .with_response(SEND, 200, r#"{"id":"abc"}"#);
        let store = MemoryTokenStore::new(Some(stored(-5)));
        let mailer = GmailMailer::new(client, store).with_send_url(SEND);

        mailer.send(&message()).await.unwrap();

        let requests = mailer.client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].content_type.as_deref(),
            Some("application/x-www-form-urlencoded")
        );
        let form = requests[0].body_text();
        assert!(form.contains("grant_type=refresh_token"));
        assert!(form.contains("refresh_token=refresh-1"));
        assert_eq!(requests[1].authorization.as_deref(), Some("Bearer new-access"));

        let saved = mailer.store().load().unwrap().unwrap();
        assert_eq!(saved.token, "new-access");
        assert_eq!(saved.refresh_token.as_deref(), Some("refresh-1"));
        assert!(saved.is_fresh(Utc::now()));
    }

    #[tokio::test]
    async fn test_send_without_stored_token_fails_before_network() {
        let mailer = GmailMailer::new(StubClient::new(), MemoryTokenStore::default())
            .with_send_url(SEND);
        let err = mailer.send(&message()).await.unwrap_err();
        assert!(err.to_string().contains("authorize"));
        assert!(mailer.client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_send_surfaces_provider_error() {
        let client = StubClient::new().with_response(SEND, 403, "insufficient scope");
        let store = MemoryTokenStore::new(Some(stored(30)));
        let mailer = GmailMailer::new(client, store).with_send_url(SEND);

        let err = mailer.send(&message()).await.unwrap_err();
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("insufficient scope"));
    }

    #[tokio::test]
    async fn test_failed_refresh_does_not_send() {
        let client = StubClient::new().with_response(DEFAULT_TOKEN_URI, 400, "invalid_grant");
        let store = MemoryTokenStore::new(Some(stored(-5)));
        let mailer = GmailMailer::new(client, store).with_send_url(SEND);

        assert!(mailer.send(&message()).await.is_err());
        assert_eq!(mailer.client.requests().len(), 1);
    }

    #[test]
    fn test_authorization_url_requests_offline_send_scope() {
        let url = authorization_url(&secrets()).unwrap();
        let parsed = reqwest::Url::parse(&url).unwrap();
        let params: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(params.contains(&("client_id".to_string(), "cid".to_string())));
        assert!(params.contains(&("scope".to_string(), GMAIL_SEND_SCOPE.to_string())));
        assert!(params.contains(&("access_type".to_string(), "offline".to_string())));
    }

    #[test]
    fn test_extract_code_from_redirect_url() {
        let code = extract_code("http://localhost/?state=x&code=4%2Fabc&scope=s").unwrap();
        assert_eq!(code, "4/abc");
        assert_eq!(extract_code("  4/abc \n").unwrap(), "4/abc");
        assert!(extract_code("http://localhost/?error=access_denied").is_err());
        assert!(extract_code("   ").is_err());
    }

    #[tokio::test]
    async fn test_exchange_code_builds_stored_token() {
        let client = StubClient::new().with_response(
            DEFAULT_TOKEN_URI,
            200,
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600}"#,
        );

        let token = exchange_code(&client, &secrets(), "4/abc").await.unwrap();
        assert_eq!(token.token, "a");
        assert_eq!(token.refresh_token.as_deref(), Some("r"));
        assert_eq!(token.client_id, "cid");

        let form = client.requests()[0].body_text();
        assert!(form.contains("grant_type=authorization_code"));
        assert!(form.contains("code=4%2Fabc"));
    }

    #[tokio::test]
    async fn test_exchange_code_requires_refresh_token() {
        let client = StubClient::new().with_response(
            DEFAULT_TOKEN_URI,
            200,
            r#"{"access_token":"a","expires_in":3600}"#,
        );
        assert!(exchange_code(&client, &secrets(), "4/abc").await.is_err());
    }
}
