//! HTTP API server
//!
//! One tokio task per connection, one request per connection. If the client
//! goes away while a request is in flight the handler future is dropped,
//! which cancels the pending model call or query.

pub mod http;
pub mod routes;

pub use http::{HttpRequest, HttpResponse};
pub use routes::{route, AppState};

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn serve(state: Arc<AppState>, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr, "Server listening");
    serve_listener(state, listener).await
}

/// Accept loop over an already bound listener.
pub async fn serve_listener(state: Arc<AppState>, listener: TcpListener) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "New connection");
        tokio::spawn(handle_connection(state.clone(), stream));
    }
}

async fn handle_connection(state: Arc<AppState>, mut stream: TcpStream) {
    let raw = match tokio::time::timeout(READ_TIMEOUT, http::read_request(&mut stream)).await {
        Ok(Ok(Some(raw))) => raw,
        Ok(Ok(None)) => return,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
            write_response(&mut stream, &HttpResponse::error(413, "Request too large", "payload_too_large")).await;
            return;
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to read request");
            return;
        }
        Err(_) => {
            warn!("Request read timed out");
            return;
        }
    };

    let Some(request) = HttpRequest::parse(&raw) else {
        write_response(&mut stream, &HttpResponse::error(400, "Malformed request", "bad_request")).await;
        return;
    };

    let span = info_span!(
        "request",
        id = %Uuid::new_v4(),
        method = %request.method,
        path = %request.path
    );

    let handled = async {
        let response = tokio::select! {
            response = route(&state, request) => response,
            _ = wait_for_disconnect(&mut stream) => {
                info!("Client disconnected, request abandoned");
                return;
            }
        };
        info!(status = response.status, "Request completed");
        write_response(&mut stream, &response).await;
    };
    handled.instrument(span).await;
}

/// Resolves once the peer closes its side of the connection.
async fn wait_for_disconnect(stream: &mut TcpStream) {
    let mut buf = [0u8; 512];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => continue,
        }
    }
}

async fn write_response(stream: &mut TcpStream, response: &HttpResponse) {
    if let Err(e) = stream.write_all(&response.to_bytes()).await {
        error!(error = %e, "Failed to write response");
    }
}
