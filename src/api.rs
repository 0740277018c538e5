//! Authorization and control-plane session handling.
//!
//! Every control-plane request carries the bearer token obtained from the
//! `/authorize` exchange plus the `x-api-key` header, so the session owns a
//! preconfigured [`reqwest::Client`] and exposes thin JSON verbs on top of it.

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Base URL of the documented WeTransfer public API.
pub const PUBLIC_API_BASE: &str = "https://dev.wetransfer.com/v2";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Reqwest error: {0:?}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Invalid header value: {0:?}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("Serde JSON parsing error: {0:?}. Response: {1}")]
    SerdeJSONError(#[source] serde_json::Error, String),
    #[error("{url} was rejected with status {status}")]
    Rejected { status: StatusCode, url: String },
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

/// An authorized control-plane session.
///
/// Constructing one performs the token exchange, so a value of this type is
/// always ready to issue API calls.
#[derive(Debug)]
pub struct ApiSession {
    client: Client,
    x_api_key: String,
    user_identifier: Option<String>,
}

impl ApiSession {
    /// Exchanges the API key for a bearer token against the public API host.
    ///
    /// `user_identifier` scopes the token to one of your users, which the
    /// transfer-by-email flow forwards as `domain_user_id`.
    pub async fn authorize(
        x_api_key: impl AsRef<str>,
        user_identifier: Option<&str>,
    ) -> Result<Self, Error> {
        Self::authorize_at(PUBLIC_API_BASE, x_api_key, user_identifier).await
    }

    /// Same as [`ApiSession::authorize`] against an alternate API host.
    pub async fn authorize_at(
        api_base: &str,
        x_api_key: impl AsRef<str>,
        user_identifier: Option<&str>,
    ) -> Result<Self, Error> {
        let x_api_key = x_api_key.as_ref();

        let mut req = Client::new()
            .post(format!("{}/authorize", api_base))
            .header(CONTENT_TYPE, "application/json")
            .header("x-api-key", x_api_key);
        if let Some(user) = user_identifier {
            req = req.json(&serde_json::json!({ "user_identifier": user }));
        }
        let auth: AuthResponse = read_json(req.send().await?).await?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", HeaderValue::from_str(x_api_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", auth.token))?,
        );
        let client = Client::builder().default_headers(headers).build()?;

        Ok(ApiSession {
            client,
            x_api_key: x_api_key.to_owned(),
            user_identifier: user_identifier.map(str::to_owned),
        })
    }

    pub fn x_api_key(&self) -> &str {
        &self.x_api_key
    }

    pub fn user_identifier(&self) -> Option<&str> {
        self.user_identifier.as_deref()
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        read_json(self.client.get(url).send().await?).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        read_json(self.client.post(url).json(body).send().await?).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        read_json(self.client.put(url).json(body).send().await?).await
    }

    /// PUT without a request body, parsing the JSON response.
    pub async fn put_bare<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        read_json(self.client.put(url).send().await?).await
    }

    /// PUT without a request body, discarding the response body.
    pub async fn put_unit(&self, url: &str) -> Result<(), Error> {
        let resp = self.client.put(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Rejected {
                status,
                url: url.to_owned(),
            });
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let url = resp.url().to_string();
    if !status.is_success() {
        return Err(Error::Rejected { status, url });
    }
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::SerdeJSONError(e, body))
}

#[cfg(test)]
pub(crate) async fn test_session(server: &mut mockito::Server) -> ApiSession {
    let auth = server
        .mock("POST", "/authorize")
        .with_status(200)
        .with_body(r#"{"token":"test-token"}"#)
        .create_async()
        .await;
    let session = ApiSession::authorize_at(&server.url(), "test-key", None)
        .await
        .unwrap();
    auth.assert_async().await;
    session
}
