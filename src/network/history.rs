use std::future::Future;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::common::ChatMessage;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history endpoint `{0}` cannot take a room segment")]
    InvalidEndpoint(Url),
    #[error("history request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Where a room's earlier messages come from.
pub trait HistorySource: Clone + Send + Sync + 'static {
    fn fetch(
        &self,
        room_id: &str,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, HistoryError>> + Send;
}

/// `GET <endpoint>/<room id>` returning a JSON array of messages.
#[derive(Clone)]
pub struct HttpHistory {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpHistory {
    pub fn new(endpoint: Url, token: Option<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    pub fn room_url(&self, room_id: &str) -> Result<Url, HistoryError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| HistoryError::InvalidEndpoint(self.endpoint.clone()))?
            .pop_if_empty()
            .push(room_id);
        Ok(url)
    }
}

impl HistorySource for HttpHistory {
    async fn fetch(&self, room_id: &str) -> Result<Vec<ChatMessage>, HistoryError> {
        let url = self.room_url(room_id)?;
        log::debug!("Fetching history from {url}");

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let messages = request
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<ChatMessage>>()
            .await?;
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(endpoint: &str) -> HttpHistory {
        HttpHistory::new(
            Url::parse(endpoint).unwrap(),
            None,
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn room_id_becomes_an_encoded_path_segment() {
        let source = history("http://localhost:5000/api/chat/messages");
        assert_eq!(
            source.room_url("co-42").unwrap().as_str(),
            "http://localhost:5000/api/chat/messages/co-42"
        );

        let source = history("http://localhost:5000/api/chat/messages/");
        assert_eq!(
            source.room_url("acme corp/hr").unwrap().as_str(),
            "http://localhost:5000/api/chat/messages/acme%20corp%2Fhr"
        );
    }

    #[test]
    fn opaque_endpoints_are_rejected() {
        let source = history("mailto:hr@example.com");
        assert!(matches!(
            source.room_url("co-42"),
            Err(HistoryError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        // Port 9 (discard) is closed on any sane test host.
        let source = history("http://127.0.0.1:9/api/chat/messages");
        assert!(source.fetch("co-42").await.is_err());
    }
}
