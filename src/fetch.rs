use std::time::{Duration, Instant};

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("arxiv_scraper/", env!("CARGO_PKG_VERSION"));

/// Single-shot GET returning the response body. No retries.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn get(&self, url: &Url) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<String> {
        let transport = |source| Error::Transport {
            url: url.to_string(),
            source,
        };

        let start = Instant::now();
        let response = self.client.get(url.clone()).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        debug!(
            "GET {} -> {} ({} bytes, {}ms)",
            url,
            status.as_u16(),
            body.len(),
            start.elapsed().as_millis()
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Answer exactly one request on a local port with a canned response.
    async fn serve_once(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        Url::parse(&format!("http://{}/list/cs.CL/recent", addr)).unwrap()
    }

    #[tokio::test]
    async fn success_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 13\r\nconnection: close\r\n\r\n<dl></dl>\r\n\r\n",
        )
        .await;
        let body = HttpFetcher::new().unwrap().get(&url).await.unwrap();
        assert_eq!(body, "<dl></dl>\r\n\r\n");
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let err = HttpFetcher::new().unwrap().get(&url).await.unwrap_err();
        match err {
            Error::Status { url: failed, status } => {
                assert_eq!(status, 503);
                assert_eq!(failed, url.to_string());
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{}/abs/2312.06733", addr)).unwrap();
        let err = HttpFetcher::new().unwrap().get(&url).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }), "got {err:?}");
        assert!(err.to_string().contains(&addr.to_string()));
    }
}
