//! Thin HTTP contract layer over [`Supervisor`]: one route per operation,
//! no session/templating concerns.

use crate::config::SlotConfig;
use crate::supervisor::Supervisor;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct HttpServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl HttpServer {
    /// Binds `addr` and serves the contract routes until `stop()` is called.
    pub async fn start(addr: &str, supervisor: Arc<Supervisor>) -> std::io::Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("invalid bind address: {e}")))?;
        let listener = TcpListener::bind(addr).await?;
        info!("HTTP contract layer listening on {addr}");

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let supervisor = supervisor.clone();
                                tokio::spawn(async move {
                                    let service = service_fn(move |req| {
                                        let supervisor = supervisor.clone();
                                        async move { route(req, supervisor).await }
                                    });
                                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                        error!("HTTP connection error: {e}");
                                    }
                                });
                            }
                            Err(e) => error!("HTTP accept error: {e}"),
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Ok(HttpServer { shutdown_tx: Some(shutdown_tx) })
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn json_response(status: StatusCode, body: &impl serde::Serialize) -> Response<Full<Bytes>> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(bytes)))
        .unwrap()
}

fn empty_status(status: StatusCode) -> Response<Full<Bytes>> {
    Response::builder().status(status).body(Full::new(Bytes::new())).unwrap()
}

async fn route(req: Request<Incoming>, supervisor: Arc<Supervisor>) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/api/sources") => match supervisor.list_sources() {
            Ok(sources) => json_response(StatusCode::OK, &sources),
            Err(e) => json_response(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()),
        },

        (&Method::GET, "/api/config") => json_response(StatusCode::OK, &supervisor.get_config()),

        (&Method::POST, "/api/config/slot") => {
            let body = req.into_body().collect().await?.to_bytes();
            match serde_json::from_slice::<SlotConfig>(&body) {
                Ok(cfg) => json_response(StatusCode::OK, &supervisor.set_slot(cfg)),
                Err(e) => json_response(StatusCode::BAD_REQUEST, &format!("invalid slot config: {e}")),
            }
        }

        (&Method::GET, "/api/active_slots") => json_response(StatusCode::OK, &supervisor.active_slots()),

        (&Method::GET, "/api/status") => json_response(StatusCode::OK, &supervisor.status()),

        (&Method::POST, "/api/start") => json_response(StatusCode::OK, &supervisor.start().await),

        (&Method::POST, "/api/stop") => json_response(StatusCode::OK, &supervisor.stop().await),

        (&Method::GET, path) if path.starts_with("/api/slot/") && path.ends_with("/sdp") => {
            match parse_slot_id(path, "/api/slot/", "/sdp") {
                Some(slot_id) => match supervisor.slot_sdp(slot_id) {
                    Some(sdp) => Response::builder()
                        .status(StatusCode::OK)
                        .header("Content-Type", "application/sdp")
                        .header("Content-Disposition", format!("attachment; filename=\"slot{slot_id}.sdp\""))
                        .body(Full::new(Bytes::from(sdp)))
                        .unwrap(),
                    None => empty_status(StatusCode::NOT_FOUND),
                },
                None => empty_status(StatusCode::NOT_FOUND),
            }
        }

        (&Method::GET, path) if path.starts_with("/api/debug/slot/") => {
            match path["/api/debug/slot/".len()..].parse::<u32>() {
                Ok(slot_id) => json_response(StatusCode::OK, &supervisor.slot_debug(slot_id)),
                Err(_) => empty_status(StatusCode::NOT_FOUND),
            }
        }

        _ => empty_status(StatusCode::NOT_FOUND),
    };

    Ok(response)
}

fn parse_slot_id(path: &str, prefix: &str, suffix: &str) -> Option<u32> {
    path.strip_prefix(prefix)?.strip_suffix(suffix)?.parse().ok()
}
