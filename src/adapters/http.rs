use crate::domain::model::{FailureReason, FetchOutcome};
use crate::domain::ports::Fetcher;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

/// Plain `GET` against the update endpoint. No headers, no body, no timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    url: Url,
}

impl HttpFetcher {
    /// Resolves `endpoint` against `base_url` the way a page resolves a relative link,
    /// so `update` against `http://host/index.html` becomes `http://host/update`.
    pub fn new(base_url: &str, endpoint: &str) -> Result<Self> {
        let url = Url::parse(base_url)?.join(endpoint)?;
        Ok(Self::with_client(Client::new(), url))
    }

    pub fn with_client(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self) -> FetchOutcome {
        tracing::debug!("Requesting update from: {}", self.url);

        let response = match self.client.get(self.url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::failure(FailureReason::Transport(e.to_string())),
        };

        let status = response.status();
        tracing::debug!("Update response status: {}", status);

        if status != StatusCode::OK {
            return FetchOutcome::failure(FailureReason::Status(status.as_u16()));
        }

        match response.text().await {
            Ok(body) => FetchOutcome::success(body),
            Err(e) => FetchOutcome::failure(FailureReason::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_endpoint_resolves_relative_to_page() {
        let fetcher = HttpFetcher::new("http://localhost:8080/index.html", "update").unwrap();
        assert_eq!(fetcher.url().as_str(), "http://localhost:8080/update");

        let fetcher = HttpFetcher::new("http://localhost:8080", "update").unwrap();
        assert_eq!(fetcher.url().as_str(), "http://localhost:8080/update");

        let fetcher = HttpFetcher::new("http://localhost:8080/app/", "update").unwrap();
        assert_eq!(fetcher.url().as_str(), "http://localhost:8080/app/update");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(HttpFetcher::new("not a url", "update").is_err());
    }

    #[tokio::test]
    async fn test_fetch_returns_body_verbatim() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/update");
            then.status(200).body("<p>5</p>");
        });

        let fetcher = HttpFetcher::new(&server.url("/"), "update").unwrap();
        let outcome = fetcher.fetch().await;

        mock.assert();
        assert_eq!(outcome, FetchOutcome::success("<p>5</p>"));
    }

    #[tokio::test]
    async fn test_fetch_reports_non_ok_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/update");
            then.status(500).body("boom");
        });

        let fetcher = HttpFetcher::new(&server.url("/"), "update").unwrap();
        assert_eq!(
            fetcher.fetch().await,
            FetchOutcome::failure(FailureReason::Status(500))
        );
    }

    #[tokio::test]
    async fn test_fetch_treats_other_success_codes_as_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/update");
            then.status(204);
        });

        let fetcher = HttpFetcher::new(&server.url("/"), "update").unwrap();
        assert_eq!(
            fetcher.fetch().await,
            FetchOutcome::failure(FailureReason::Status(204))
        );
    }

    #[tokio::test]
    async fn test_fetch_reports_transport_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let fetcher = HttpFetcher::new(&format!("http://127.0.0.1:{}/", port), "update").unwrap();
        match fetcher.fetch().await {
            FetchOutcome::Failure {
                reason: FailureReason::Transport(_),
            } => {}
            other => panic!("expected transport failure, got {:?}", other),
        }
    }
}
