//! The HTTP boundary of the crate.
//!
//! Everything that goes over the wire is funneled through the [`Transport`] trait,
//! so [`crate::api`] never talks to [`reqwest`] directly.
//! [`ReqwestTransport`] is the implementation you want outside of tests.

use std::time::Duration;

use bytes::Bytes;
use log::debug;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// The request timeout used by [`ReqwestTransport::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The `User-Agent` header used by [`ReqwestTransport::new`].
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A blocking-style request/response round trip against the API host.
///
/// Every call is a single GET; nothing is cached and nothing is retried.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Fetch the raw body of `url`.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] if the connection fails or times out,
    /// [`Error::Status`] if the status is not `200 OK`.
    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes>;

    /// Send a GET to `url` and return whatever status the server answered with.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] if the connection fails or times out.
    async fn ping(&self, url: &Url) -> Result<StatusCode>;

    /// Fetch `url` and parse the body as JSON.
    ///
    /// The API answers a query without matches with an empty body instead of `[]`,
    /// so a blank body is parsed as JSON `null`. Ask for an `Option` if you need to tell them apart.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_bytes`], plus [`Error::Parse`] if the body is not valid JSON for `T`.
    async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let body = self.fetch_bytes(url).await?;
        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &body
        };
        serde_json::from_slice(body).map_err(|source| Error::Parse {
            url: url.clone(),
            source,
        })
    }
}

/// [`Transport`] backed by a [`reqwest::Client`].
///
/// # Example
///
/// ```no_run
/// use safebooru_dl::api::url::API_URL;
/// use safebooru_dl::transport::{ReqwestTransport, Transport as _};
///
/// #[tokio::main]
/// async fn main() -> safebooru_dl::Result<()> {
///     let transport = ReqwestTransport::new()?;
///     let status = transport.ping(&API_URL).await?;
///     println!("safebooru answered with {status}");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with [`DEFAULT_TIMEOUT`] and [`DEFAULT_USER_AGENT`].
    ///
    /// # Errors
    ///
    /// [`Error::Client`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::build(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Build a transport with a custom timeout and `User-Agent`.
    ///
    /// A zero `timeout` disables the timeout.
    ///
    /// # Errors
    ///
    /// [`Error::Client`] if the TLS backend cannot be initialized,
    /// or if `user_agent` is not a valid header value.
    pub fn build(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client_builder = Client::builder().user_agent(user_agent);
        let client_builder = if timeout.is_zero() {
            client_builder
        } else {
            client_builder.timeout(timeout)
        };
        let client = client_builder.build().map_err(Error::Client)?;
        Ok(Self::from_client(client))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &Url) -> Result<Response> {
        debug!("GET {url}");
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| Error::Network {
                url: url.clone(),
                source,
            })
    }
}

impl Transport for ReqwestTransport {
    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes> {
        let response = self.get(url).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Status {
                url: url.clone(),
                status,
            });
        }
        response.bytes().await.map_err(|source| Error::Network {
            url: url.clone(),
            source,
        })
    }

    async fn ping(&self, url: &Url) -> Result<StatusCode> {
        Ok(self.get(url).await?.status())
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Accept a single connection, read the request head and answer with `response`.
    async fn serve_once(response: String) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        Url::parse(&format!("http://{addr}/index.php")).unwrap()
    }

    fn local_transport(timeout: Duration) -> ReqwestTransport {
        let client = Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .unwrap();
        ReqwestTransport::from_client(client)
    }

    #[test]
    fn test_build_transport() {
        ReqwestTransport::new().unwrap();
        ReqwestTransport::build(Duration::ZERO, "custom agent/1.0").unwrap();
        assert!(matches!(
            ReqwestTransport::build(DEFAULT_TIMEOUT, "bad\nagent"),
            Err(Error::Client(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_bytes_ok() {
        let url = serve_once(http_response("200 OK", "hello")).await;
        let body = local_transport(DEFAULT_TIMEOUT)
            .fetch_bytes(&url)
            .await
            .unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn test_fetch_bytes_non_200() {
        let url = serve_once(http_response("404 Not Found", "")).await;
        let err = local_transport(DEFAULT_TIMEOUT)
            .fetch_bytes(&url)
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert!(matches!(
            err,
            Error::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_json_malformed() {
        let url = serve_once(http_response("200 OK", "[{\"id\": ")).await;
        let err = local_transport(DEFAULT_TIMEOUT)
            .fetch_json::<Value>(&url)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(!err.is_network());
    }

    #[tokio::test]
    async fn test_ping_reports_any_status() {
        let url = serve_once(http_response("503 Service Unavailable", "")).await;
        let status = local_transport(DEFAULT_TIMEOUT).ping(&url).await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let err = local_transport(DEFAULT_TIMEOUT)
            .ping(&url)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // accept, then never answer
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let err = local_transport(Duration::from_millis(200))
            .fetch_bytes(&url)
            .await
            .unwrap_err();
        match err {
            Error::Network { source, .. } => assert!(source.is_timeout()),
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_body_is_null() {
        let url = Url::parse("https://example.com/empty").unwrap();
        let transport = MockTransport::default().route(url.as_str(), " \n");
        let value: Option<Vec<Value>> = transport.fetch_json(&url).await.unwrap();
        assert!(value.is_none());
    }
}
