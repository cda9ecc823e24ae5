use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use url::Url;

use crate::{
    collaborator::{
        SUBSCRIBE_PATH, ServerCollaborator, TEST_PUSH_PATH, TestPushReceipt, TestPushRequest,
        UNSUBSCRIBE_PATH, UnsubscribeRequest, VAPID_PUBLIC_KEY_PATH, VapidKeyResponse,
    },
    error::PlatformError,
    platform::{FetchRequest, FetchResponse, Network},
    subscription::model::PushSubscription,
};

/// Server collaborator over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpCollaborator {
    client: Client,
    base: Url,
}

impl HttpCollaborator {
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("joining {path} onto {}", self.base))
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        bail!("server responded with {status}: {body}")
    }
}

#[async_trait]
impl ServerCollaborator for HttpCollaborator {
    async fn fetch_public_key(&self) -> Result<String> {
        let url = self.url(VAPID_PUBLIC_KEY_PATH)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("requesting vapid public key")?;
        let key: VapidKeyResponse = Self::ensure_success(response)
            .await?
            .json()
            .await
            .context("decoding vapid public key response")?;
        tracing::debug!(len = key.public_key.len(), "received vapid public key");
        Ok(key.public_key)
    }

    async fn save_subscription(&self, subscription: &PushSubscription) -> Result<()> {
        let url = self.url(SUBSCRIBE_PATH)?;
        let response = self
            .client
            .post(url)
            .json(subscription)
            .send()
            .await
            .context("posting subscription")?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn remove_subscription(&self, endpoint: &str) -> Result<()> {
        let url = self.url(UNSUBSCRIBE_PATH)?;
        let response = self
            .client
            .post(url)
            .json(&UnsubscribeRequest { endpoint })
            .send()
            .await
            .context("posting unsubscribe")?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn send_test(&self, message: &str) -> Result<TestPushReceipt> {
        let url = self.url(TEST_PUSH_PATH)?;
        let response = self
            .client
            .post(url)
            .json(&TestPushRequest { message })
            .send()
            .await
            .context("posting test push")?;
        let body = Self::ensure_success(response).await?.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

/// Network access for the agent's fetch pass-through.
#[derive(Debug, Clone, Default)]
pub struct HttpNetwork {
    client: Client,
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, PlatformError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| PlatformError::Other(format!("bad method {}: {e}", request.method)))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?
            .to_vec();

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
