//! Twitter/X posting over OAuth 1.0a user context.
//!
//! Statuses go to the v2 `tweets` endpoint; images go through the v1.1
//! media upload endpoint first and are attached by media id. Every request
//! is signed with HMAC-SHA1 over the method, URL and OAuth parameters.
//! Request bodies are JSON or multipart, so no body parameters are signed.

use crate::error::CoreError;
use crate::notifier::{extract_error_reason, PostResult, SocialPoster};
use crate::settings::Settings;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub const TWEETS_URL: &str = "https://api.twitter.com/2/tweets";
pub const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";

/// RFC 3986 unreserved characters stay as-is; everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

#[derive(Debug, Clone)]
pub struct TwitterCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl TwitterCredentials {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_key: settings.twitter_api_key.clone(),
            api_secret: settings.twitter_api_secret.clone(),
            access_token: settings.twitter_access_token.clone(),
            access_token_secret: settings.twitter_access_token_secret.clone(),
        }
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// `METHOD&url&params`, with params sorted by encoded key then value.
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();
    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}&{}&{}", method.to_uppercase(), encode(url), encode(&joined))
}

pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> Result<String, CoreError> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| CoreError::InvalidInput(format!("HMAC key error: {}", e)))?;
    mac.update(base_string.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub struct TwitterClient {
    client: Client,
    credentials: TwitterCredentials,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials) -> Self {
        Self {
            client: Client::new(),
            credentials,
        }
    }

    /// `Authorization` header value for one request.
    fn authorization(&self, method: &str, url: &str, nonce: &str, timestamp: i64) -> Result<String, CoreError> {
        let creds = &self.credentials;
        let mut params = vec![
            ("oauth_consumer_key".to_string(), creds.api_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), creds.access_token.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];
        let base = signature_base_string(method, url, &params);
        let signature = sign(&base, &creds.api_secret, &creds.access_token_secret)?;
        params.push(("oauth_signature".to_string(), signature));
        params.sort();

        let fields = params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {}", fields))
    }

    fn fresh_authorization(&self, method: &str, url: &str) -> Result<String, CoreError> {
        self.authorization(method, url, &nonce(), chrono::Utc::now().timestamp())
    }

    /// Parse a JSON response body, turning non-2xx into `CoreError::Social`.
    async fn read_json(response: Response) -> PostResult<Value> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CoreError::Social {
                status: status.as_u16(),
                reason: extract_error_reason(&body),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait(?Send)]
impl SocialPoster for TwitterClient {
    async fn upload_media(&self, bytes: &[u8]) -> PostResult<String> {
        debug!("Uploading {} bytes of media", bytes.len());
        let auth = self.fresh_authorization("POST", MEDIA_UPLOAD_URL)?;
        let form = Form::new().part("media", Part::bytes(bytes.to_vec()).file_name("image"));
        let response = self
            .client
            .post(MEDIA_UPLOAD_URL)
            .header("Authorization", auth)
            .multipart(form)
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        body.get("media_id_string")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CoreError::ParseError("media upload response has no media_id_string".to_string()))
    }

    async fn post_status(&self, text: &str, media_ids: &[String]) -> PostResult<String> {
        let mut payload = json!({ "text": text });
        if !media_ids.is_empty() {
            payload["media"] = json!({ "media_ids": media_ids });
        }

        let auth = self.fresh_authorization("POST", TWEETS_URL)?;
        let response = self
            .client
            .post(TWEETS_URL)
            .header("Authorization", auth)
            .json(&payload)
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        body.pointer("/data/id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CoreError::ParseError("tweet response has no data.id".to_string()))
    }
}
