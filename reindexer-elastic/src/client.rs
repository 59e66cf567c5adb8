//! Thin JSON-over-HTTP client for the Elasticsearch REST API

use crate::config::ElasticConfig;
use crate::error::{ElasticError, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
enum BasicAuth {
    None,
    Credentials {
        username: String,
        password: Option<String>,
    },
}

/// Connection to one cluster
#[derive(Debug, Clone)]
pub struct ElasticClient {
    http: Client,
    base: Url,
    basic_auth: BasicAuth,
}

impl ElasticClient {
    pub fn new(config: &ElasticConfig) -> Result<Self> {
        let base = Url::parse(&config.url)?;
        if base.cannot_be_a_base() {
            return Err(ElasticError::Config(format!(
                "'{}' cannot be used as a base URL",
                config.url
            )));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(ref key) = config.api_key {
            let value = format!("ApiKey {}", key)
                .parse()
                .map_err(|_| ElasticError::Config("api_key is not a valid header value".into()))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;

        let basic_auth = match (&config.api_key, &config.username) {
            (None, Some(username)) => BasicAuth::Credentials {
                username: username.clone(),
                password: config.password.clone(),
            },
            _ => BasicAuth::None,
        };

        Ok(Self {
            http,
            base,
            basic_auth,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// URL for the given path segments, each percent-encoded
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ElasticError::Config(format!("'{}' cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.url(segments)?;
        debug!("{} {}", method, url);

        let builder = self.http.request(method, url);
        Ok(match self.basic_auth {
            BasicAuth::None => builder,
            BasicAuth::Credentials {
                ref username,
                ref password,
            } => builder.basic_auth(username, password.as_ref()),
        })
    }

    /// Send and decode a JSON response, failing on any non-success status
    pub async fn send_json(&self, builder: RequestBuilder) -> Result<Value> {
        let response = builder.send().await?;
        Self::decode(response).await
    }

    /// Like [`Self::send_json`], but a 404 yields `None`
    pub async fn send_json_opt(&self, builder: RequestBuilder) -> Result<Option<Value>> {
        let response = builder.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    /// HEAD-style existence check: 2xx is true, 404 is false
    pub async fn exists(&self, builder: RequestBuilder) -> Result<bool> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(Self::status_error(response).await)
        }
    }

    async fn decode(response: Response) -> Result<Value> {
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn status_error(response: Response) -> ElasticError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ElasticError::Status { status, body }
    }
}
