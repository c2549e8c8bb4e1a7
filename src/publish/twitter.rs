//! X/Twitter API v2 publishing channel

use super::oauth::{AccessToken, ConsumerKeys, OAuthSigner};
use super::{Channel, PostReceipt};
use crate::{CharityError, Result};
use reqwest::blocking::Response;
use reqwest::StatusCode;
use serde::Deserialize;
use std::cell::RefCell;

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct User {
    id: String,
}

#[derive(Deserialize)]
struct Tweet {
    id: String,
    #[serde(default)]
    text: String,
}

/// Posts as the account owning the access token
pub struct TwitterChannel {
    client: reqwest::blocking::Client,
    signer: OAuthSigner,
    api_base: String,
    user_id: RefCell<Option<String>>,
}

impl TwitterChannel {
    pub fn new(api_base: &str, consumer: ConsumerKeys, token: AccessToken) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("charity/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(TwitterChannel {
            client,
            signer: OAuthSigner::new(consumer, Some(token)),
            api_base: api_base.trim_end_matches('/').to_string(),
            user_id: RefCell::new(None),
        })
    }

    /// Build from the `TWITTER_*` credential variables
    pub fn from_env(api_base: &str) -> Result<Self> {
        Self::new(api_base, ConsumerKeys::from_env()?, AccessToken::from_env()?)
    }

    fn get(&self, url: &str) -> Result<Response> {
        let header = self.signer.authorization("GET", url, &[])?;
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, header)
            .send()?;
        check(response, StatusCode::OK)
    }

    /// Numeric id of the authenticated account (looked up once)
    fn user_id(&self) -> Result<String> {
        if let Some(id) = self.user_id.borrow().as_ref() {
            return Ok(id.clone());
        }

        let url = format!("{}/2/users/me", self.api_base);
        let envelope: Envelope<User> = self.get(&url)?.json()?;
        let id = envelope
            .data
            .map(|u| u.id)
            .ok_or_else(|| CharityError::Publish {
                status: 200,
                body: "users/me returned no user".to_string(),
            })?;

        *self.user_id.borrow_mut() = Some(id.clone());
        Ok(id)
    }
}

impl Channel for TwitterChannel {
    fn latest_post(&self) -> Result<Option<String>> {
        // the endpoint refuses max_results below 5
        let url = format!(
            "{}/2/users/{}/tweets?max_results=5",
            self.api_base,
            self.user_id()?
        );
        let envelope: Envelope<Vec<Tweet>> = self.get(&url)?.json()?;
        Ok(envelope
            .data
            .and_then(|tweets| tweets.into_iter().next())
            .map(|tweet| unescape(&tweet.text)))
    }

    fn post(&self, text: &str) -> Result<PostReceipt> {
        let url = format!("{}/2/tweets", self.api_base);
        let header = self.signer.authorization("POST", &url, &[])?;
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, header)
            .json(&serde_json::json!({ "text": text }))
            .send()?;
        let envelope: Envelope<Tweet> = check(response, StatusCode::CREATED)?.json()?;

        let id = envelope
            .data
            .map(|t| t.id)
            .ok_or_else(|| CharityError::Publish {
                status: StatusCode::CREATED.as_u16(),
                body: "post response had no data".to_string(),
            })?;
        Ok(PostReceipt { id })
    }
}

/// Map anything but `expected` to a publish error
fn check(response: Response, expected: StatusCode) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let reset = response
            .headers()
            .get("x-rate-limit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(CharityError::RateLimited { reset });
    }

    let body = response.text().unwrap_or_default();
    Err(CharityError::Publish {
        status: status.as_u16(),
        body,
    })
}

/// Post text comes back with &, < and > escaped
fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
