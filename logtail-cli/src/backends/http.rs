use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio::sync::mpsc;

use logtail_core::backend::{Backend, BackendError, ChannelTransport, Transport, TransportEvent};
use logtail_core::host::Host;
use logtail_core::sse::SseDecoder;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Requests that are not streams give up after this long
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend speaking plain HTTP to a log server
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new() -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(request_error)?;
        Ok(Self { client })
    }
}

fn request_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout
    } else if let Some(status) = error.status() {
        BackendError::Status {
            code: status.as_u16(),
        }
    } else {
        BackendError::Request {
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn alive(&self, host: &Host) -> Result<(), BackendError> {
        let response = self
            .client
            .get(host.endpoint("alive"))
            .header(CONTENT_TYPE, "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Status {
                code: response.status().as_u16(),
            })
        }
    }

    async fn list_files(&self, host: &Host) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(host.endpoint("list-files"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(BackendError::Status {
                code: response.status().as_u16(),
            });
        }

        // An empty directory is reported as `null`
        let files: Option<Vec<String>> = response.json().await.map_err(|e| BackendError::Decode {
            message: e.to_string(),
        })?;
        Ok(files.unwrap_or_default())
    }

    async fn open_stream(
        &self,
        host: &Host,
        file: &str,
    ) -> Result<Box<dyn Transport>, BackendError> {
        let (tx, rx) = mpsc::channel(1_024);
        let relay = tokio::spawn(relay_events(
            self.client.clone(),
            host.endpoint("stream-logs"),
            file.to_string(),
            tx,
        ));
        Ok(Box::new(ChannelTransport::new(rx, Some(relay.abort_handle()))))
    }
}

/// Read the event stream and forward each message payload
async fn relay_events(
    client: reqwest::Client,
    url: String,
    file: String,
    tx: mpsc::Sender<TransportEvent>,
) {
    let response = client
        .get(&url)
        .query(&[("file", file.as_str())])
        .header(ACCEPT, "text/event-stream")
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(error) => {
            tracing::debug!(%url, %error, "stream request failed");
            let _ = tx.send(TransportEvent::Failed(error.to_string())).await;
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        tracing::debug!(%url, %status, "stream rejected");
        let _ = tx
            .send(TransportEvent::Failed(format!("HTTP {}", status.as_u16())))
            .await;
        return;
    }

    tracing::debug!(%url, file = %file, "stream open");
    let mut decoder = SseDecoder::new();
    let mut bytes_stream = response.bytes_stream();

    while let Some(chunk_result) = bytes_stream.next().await {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(error) => {
                tracing::debug!(%url, %error, "stream read failed");
                let _ = tx.send(TransportEvent::Failed(error.to_string())).await;
                return;
            }
        };

        for event in decoder.feed(&chunk) {
            if event.is_message() && tx.send(TransportEvent::Message(event.data)).await.is_err() {
                return;
            }
        }
    }

    if decoder.finish() {
        tracing::debug!(%url, "stream ended mid-event");
    }
    let _ = tx.send(TransportEvent::Closed).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one connection with `response`, then close it. The handle
    /// yields the request head.
    async fn serve_once(response: &'static [u8]) -> (Host, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });
        (Host::new("fixture", &format!("http://{}", addr)), server)
    }

    #[tokio::test]
    async fn test_alive_ok_and_status() {
        let backend = HttpBackend::new().unwrap();
        let (host, server) =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        assert_eq!(backend.alive(&host).await, Ok(()));
        assert!(server.await.unwrap().starts_with("GET /alive "));

        let (host, _server) = serve_once(
            b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert_eq!(backend.alive(&host).await, Err(BackendError::Status { code: 503 }));
    }

    #[tokio::test]
    async fn test_list_files_parses_array() {
        let backend = HttpBackend::new().unwrap();
        let (host, server) = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 23\r\nConnection: close\r\n\r\n[\"system.log\",\"db.log\"]",
        )
        .await;
        assert_eq!(
            backend.list_files(&host).await,
            Ok(vec!["system.log".to_string(), "db.log".to_string()])
        );
        assert!(server.await.unwrap().starts_with("GET /list-files "));
    }

    #[tokio::test]
    async fn test_list_files_null_is_empty() {
        let backend = HttpBackend::new().unwrap();
        let (host, _server) = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 4\r\nConnection: close\r\n\r\nnull",
        )
        .await;
        assert_eq!(backend.list_files(&host).await, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_list_files_error_status() {
        let backend = HttpBackend::new().unwrap();
        let (host, _server) = serve_once(
            b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert_eq!(
            backend.list_files(&host).await,
            Err(BackendError::Status { code: 500 })
        );
    }

    #[tokio::test]
    async fn test_list_files_bad_json_is_decode_error() {
        let backend = HttpBackend::new().unwrap();
        let (host, _server) = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json",
        )
        .await;
        assert!(matches!(
            backend.list_files(&host).await,
            Err(BackendError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_stream_relays_messages_and_drops_cut_event() {
        let backend = HttpBackend::new().unwrap();
        let (host, server) = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n: hi\n\ndata: hello\n\nevent: ping\ndata: skip\n\ndata: Error: disk fu",
        )
        .await;
        let mut transport = backend.open_stream(&host, "app log.log").await.unwrap();

        let mut events = Vec::new();
        while let Some(event) = transport.next().await {
            let done = event == TransportEvent::Closed;
            events.push(event);
            if done {
                break;
            }
        }
        assert_eq!(
            events,
            vec![TransportEvent::Message("hello".into()), TransportEvent::Closed]
        );

        let head = server.await.unwrap();
        assert!(head.starts_with("GET /stream-logs?file=app+log.log "));
        assert!(head.to_ascii_lowercase().contains("accept: text/event-stream"));
    }

    #[tokio::test]
    async fn test_stream_rejected_status_fails_transport() {
        let backend = HttpBackend::new().unwrap();
        let (host, _server) = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let mut transport = backend.open_stream(&host, "missing.log").await.unwrap();
        assert_eq!(
            transport.next().await,
            Some(TransportEvent::Failed("HTTP 404".into()))
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_maps_to_request_error() {
        let backend = HttpBackend::new().unwrap();
        // nothing listens on the discard port
        let host = Host::new("closed", "http://127.0.0.1:9");
        match backend.alive(&host).await {
            Err(BackendError::Request { .. }) | Err(BackendError::Timeout) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_failure_is_reported_on_transport() {
        let backend = HttpBackend::new().unwrap();
        let host = Host::new("closed", "http://127.0.0.1:9");
        let mut transport = backend.open_stream(&host, "system.log").await.unwrap();
        assert!(matches!(transport.next().await, Some(TransportEvent::Failed(_))));
    }
}
