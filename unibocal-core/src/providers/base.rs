use std::time::Duration;

use reqwest::{Client, ClientBuilder, IntoUrl, header};
use serde::de::DeserializeOwned;

use crate::{Error, Result};

pub const DEFAULT_USER_AGENT: &str = "CalendarBot";

/// 基础provider结构
pub struct BaseProviderBuilder {
    pub client_builder: ClientBuilder,
    pub info: ProviderInfo,
}

pub struct BaseProvider {
    pub client: Client,
    pub info: ProviderInfo,
}

pub struct ProviderInfo {
    pub name: String,
}

impl BaseProviderBuilder {
    pub fn new(info: ProviderInfo) -> Self {
        let client_builder = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));
                headers.insert(
                    header::ACCEPT_ENCODING,
                    header::HeaderValue::from_static("br;q=1.0, gzip;q=0.9, deflate;q=0.8"),
                );
                headers
            });

        Self {
            client_builder,
            info,
        }
    }

    pub fn new_with_timeout(info: ProviderInfo, timeout_secs: u64) -> Self {
        let mut s = Self::new(info);
        s.client_builder = s.client_builder.timeout(Duration::from_secs(timeout_secs));
        s
    }

    pub fn build(self) -> Result<BaseProvider> {
        let client = self
            .client_builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(BaseProvider {
            client,
            info: self.info,
        })
    }
}

impl BaseProvider {
    /// 通用的错误处理
    pub fn handle_error_req(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout
        } else if error.is_request() || error.is_connect() {
            Error::Upstream {
                source_name: self.info.name.clone(),
                message: format!("Request failed: {}", error),
            }
        } else {
            Error::Http(error)
        }
    }

    pub fn custom_error(&self, message: impl Into<String>) -> Error {
        Error::Upstream {
            source_name: self.info.name.clone(),
            message: message.into(),
        }
    }

    /// GET 并返回响应正文，非 2xx 视为上游错误
    pub async fn get_text(&self, url: impl IntoUrl) -> Result<String> {
        let url = url.into_url()?;
        tracing::debug!(provider = %self.info.name, %url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.handle_error_req(e))?;

        if !response.status().is_success() {
            return Err(self.custom_error(format!("HTTP {} error", response.status())));
        }

        response.text().await.map_err(|e| self.handle_error_req(e))
    }

    /// GET 并解析 JSON，解析失败视为数据格式错误
    pub async fn get_json<T: DeserializeOwned>(&self, url: impl IntoUrl) -> Result<T> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| {
            Error::Malformed(format!(
                "{}: failed to parse response: {}",
                self.info.name, e
            ))
        })
    }

    pub async fn get_bytes(&self, url: impl IntoUrl) -> Result<Vec<u8>> {
        let url = url.into_url()?;
        tracing::debug!(provider = %self.info.name, %url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.handle_error_req(e))?;

        if !response.status().is_success() {
            return Err(self.custom_error(format!("HTTP {} error", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.handle_error_req(e))?;
        Ok(bytes.to_vec())
    }
}
