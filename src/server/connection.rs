// Connection handling module
// Serves one accepted TCP connection over HTTP/1.1

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::handler;
use crate::http;
use crate::logger;

/// Serve a connection in its own task.
///
/// Each request gets `performance.request_timeout` seconds, body included,
/// and is answered with 408 when it runs out. Between requests the
/// connection is closed once no headers arrive within
/// `performance.keep_alive_timeout` seconds.
pub fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let request_timeout = Duration::from_secs(state.config.performance.request_timeout);
        let keep_alive_timeout =
            Duration::from_secs(state.config.performance.keep_alive_timeout);

        let service = service_fn(move |req| {
            let state = Arc::clone(&state);
            async move {
                let handling = handler::handle_request(req, state, Some(peer_addr));
                match tokio::time::timeout(request_timeout, handling).await {
                    Ok(result) => result,
                    Err(_) => {
                        logger::log_warning(&format!(
                            "Request from {peer_addr} timed out after {} seconds",
                            request_timeout.as_secs()
                        ));
                        Ok(http::build_408_response())
                    }
                }
            }
        });

        let conn = http1::Builder::new()
            .timer(TokioTimer::new())
            .header_read_timeout(keep_alive_timeout)
            .keep_alive(true)
            .serve_connection(io, service);

        match conn.await {
            // Idle keep-alive connection reached `keep_alive_timeout`
            Err(err) if err.is_timeout() => {}
            Err(err) => logger::log_connection_error(&err),
            Ok(()) => {}
        }
    });
}
