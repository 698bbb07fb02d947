//! Minimal HTTP/1.1 server for responses a mock server cannot produce:
//! bodies without a `Content-Length`, bodies shorter than advertised, and
//! bodies delivered in paced chunks.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves every connection with `head`, then `chunks` separated by `pause`,
/// then closes the connection. Returns the base URL (`http://127.0.0.1:<port>`).
pub async fn serve_raw(head: &'static str, chunks: Vec<Vec<u8>>, pause: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let chunks = chunks.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for (index, chunk) in chunks.iter().enumerate() {
                    if index > 0 {
                        tokio::time::sleep(pause).await;
                    }
                    if socket.write_all(chunk).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

/// Response head with no length: the body runs until the connection closes.
pub const UNKNOWN_LENGTH_HEAD: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nConnection: close\r\n\r\n";

/// Response head advertising 100 bytes.
pub const HUNDRED_BYTES_HEAD: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: 100\r\nConnection: close\r\n\r\n";
