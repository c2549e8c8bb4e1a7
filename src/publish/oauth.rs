//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Signs requests with a consumer key pair and, once issued, an access token
//! pair. Also drives the one-time PIN flow that issues the access token; the
//! periodic pipeline only ever consumes an existing pair.

use crate::{CharityError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Url;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

/// Application key pair
#[derive(Debug, Clone)]
pub struct ConsumerKeys {
    pub key: String,
    pub secret: String,
}

impl ConsumerKeys {
    pub fn new(key: String, secret: String) -> Self {
        ConsumerKeys { key, secret }
    }

    /// Load from `TWITTER_API_KEY` / `TWITTER_API_SECRET`
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            required_env("TWITTER_API_KEY")?,
            required_env("TWITTER_API_SECRET")?,
        ))
    }
}

/// User token pair (request token during the PIN flow, access token afterwards)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub secret: String,
}

impl AccessToken {
    pub fn new(token: String, secret: String) -> Self {
        AccessToken { token, secret }
    }

    /// Load from `TWITTER_OAUTH_TOKEN` / `TWITTER_OAUTH_TOKEN_SECRET`
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            required_env("TWITTER_OAUTH_TOKEN")?,
            required_env("TWITTER_OAUTH_TOKEN_SECRET")?,
        ))
    }

    /// Parse a form-encoded token endpoint response
    pub fn from_form(body: &str) -> Result<Self> {
        let mut token = None;
        let mut secret = None;
        for pair in body.trim().split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(value)
                .map_err(|e| CharityError::Credential(format!("Bad token response: {}", e)))?
                .into_owned();
            match key {
                "oauth_token" => token = Some(value),
                "oauth_token_secret" => secret = Some(value),
                _ => {}
            }
        }

        match (token, secret) {
            (Some(token), Some(secret)) => Ok(Self::new(token, secret)),
            _ => Err(CharityError::Credential(format!(
                "Token response has no token pair: {}",
                body
            ))),
        }
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CharityError::Credential(name.to_string())),
    }
}

/// RFC 3986 percent-encoding as OAuth requires
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Builds `Authorization: OAuth ...` header values
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    consumer: ConsumerKeys,
    token: Option<AccessToken>,
}

impl OAuthSigner {
    pub fn new(consumer: ConsumerKeys, token: Option<AccessToken>) -> Self {
        OAuthSigner { consumer, token }
    }

    /// Header for a request with a fresh nonce and the current time.
    ///
    /// `params` are extra signed parameters (form fields or `oauth_*` protocol
    /// parameters); only the `oauth_*` ones are placed in the header. Query
    /// parameters of `url` are signed automatically. JSON bodies are not signed.
    pub fn authorization(&self, method: &str, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| CharityError::Credential(format!("System clock error: {}", e)))?
            .as_secs();
        self.authorization_with(method, url, params, &nonce, timestamp)
    }

    fn authorization_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: u64,
    ) -> Result<String> {
        let timestamp = timestamp.to_string();
        let mut oauth: Vec<(String, String)> = vec![
            ("oauth_consumer_key".to_string(), self.consumer.key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];
        if let Some(token) = &self.token {
            oauth.push(("oauth_token".to_string(), token.token.clone()));
        }
        for (key, value) in params.iter().filter(|(k, _)| k.starts_with("oauth_")) {
            oauth.push((key.to_string(), value.to_string()));
        }

        let signature = self.signature(method, url, &oauth, params)?;
        oauth.push(("oauth_signature".to_string(), signature));
        oauth.sort();

        let fields: Vec<String> = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        oauth: &[(String, String)],
        params: &[(&str, &str)],
    ) -> Result<String> {
        let mut parsed = Url::parse(url)
            .map_err(|e| CharityError::Config(format!("Invalid URL {}: {}", url, e)))?;

        let mut signed: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (encode(&k), encode(&v)))
            .collect();
        signed.extend(oauth.iter().map(|(k, v)| (encode(k), encode(v))));
        signed.extend(
            params
                .iter()
                .filter(|(k, _)| !k.starts_with("oauth_"))
                .map(|(k, v)| (encode(k), encode(v))),
        );
        signed.sort();

        let param_string = signed
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        parsed.set_query(None);
        parsed.set_fragment(None);
        let base = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(parsed.as_str()),
            encode(&param_string)
        );

        let key = format!(
            "{}&{}",
            encode(&self.consumer.secret),
            encode(self.token.as_ref().map(|t| t.secret.as_str()).unwrap_or(""))
        );
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| CharityError::Credential(format!("HMAC init failed: {}", e)))?;
        mac.update(base.as_bytes());

        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

/// Interactive PIN-based authorization ("out of band" callback)
pub struct PinFlow {
    client: reqwest::blocking::Client,
    consumer: ConsumerKeys,
    api_base: String,
}

impl PinFlow {
    pub fn new(consumer: ConsumerKeys, api_base: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("charity/0.1")
            .build()?;
        Ok(PinFlow {
            client,
            consumer,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Step 1: obtain a temporary request token with write access
    pub fn request_token(&self) -> Result<AccessToken> {
        let url = format!(
            "{}/oauth/request_token?oauth_callback=oob&x_auth_access_type=write",
            self.api_base
        );
        let signer = OAuthSigner::new(self.consumer.clone(), None);
        self.token_request(&url, &signer, &[])
    }

    /// Step 2: where the account owner approves the app and reads the PIN
    pub fn authorize_url(&self, request: &AccessToken) -> String {
        format!(
            "{}/oauth/authorize?oauth_token={}",
            self.api_base,
            encode(&request.token)
        )
    }

    /// Step 3: trade the request token and PIN for the long-lived access token
    pub fn access_token(&self, request: &AccessToken, pin: &str) -> Result<AccessToken> {
        let url = format!("{}/oauth/access_token", self.api_base);
        let signer = OAuthSigner::new(self.consumer.clone(), Some(request.clone()));
        self.token_request(&url, &signer, &[("oauth_verifier", pin.trim())])
    }

    fn token_request(
        &self,
        url: &str,
        signer: &OAuthSigner,
        params: &[(&str, &str)],
    ) -> Result<AccessToken> {
        let header = signer.authorization("POST", url, params)?;
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, header)
            .send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(CharityError::Credential(format!(
                "{} returned HTTP {}: {}",
                url,
                status.as_u16(),
                body
            )));
        }

        AccessToken::from_form(&body)
    }
}
