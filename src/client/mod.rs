//! Authenticated JSON client for the repository service.

pub mod write;

use crate::error::{ConfigError, TransportError};
use crate::session::Session;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

pub use write::{RepoWriter, WriteResult};

pub struct PdsClient {
    base: Url,
    http: Client,
    session: Session,
}

impl PdsClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ConfigError::ServiceUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            base,
            http: build_http_client(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// POST a JSON body and decode a JSON response. Non-2xx statuses and
    /// transport failures map to [`TransportError`]. No retries here;
    /// retry policy is a caller concern.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.session.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                endpoint: path.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode {
                endpoint: path.to_string(),
                message: e.to_string(),
            })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::Request {
                endpoint: path.to_string(),
                message: e.to_string(),
            })
    }
}

fn build_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            did: "did:plc:alice".into(),
            access_token: "token".into(),
            ckb_addr: None,
        }
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(PdsClient::new("not a url", session()).is_err());
    }

    #[test]
    fn strips_trailing_slash() {
        let client = PdsClient::new("https://pds.example.com/", session()).unwrap();
        assert_eq!(client.base.as_str(), "https://pds.example.com/");
        let url = client.endpoint("/record/prepare").unwrap();
        assert_eq!(url.path(), "/record/prepare");
    }
}
