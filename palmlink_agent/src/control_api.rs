use crate::dispatch::WorkspaceActions;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use palmlink_protocol::{ControlAction, ControlFailure, ControlOk, ControlRequest};
use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

#[derive(Clone)]
struct ApiState {
    workspace: Arc<dyn WorkspaceActions>,
}

pub fn router(workspace: Arc<dyn WorkspaceActions>) -> Router {
    Router::new()
        .route("/api/control", post(control_handler))
        .with_state(ApiState { workspace })
}

async fn control_handler(
    State(state): State<ApiState>,
    Json(request): Json<ControlRequest>,
) -> Response {
    let Ok(action) = request.action.parse::<ControlAction>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ControlFailure {
                error: "Unknown action".to_string(),
            }),
        )
            .into_response();
    };

    let workspace = Arc::clone(&state.workspace);
    let outcome = tokio::task::spawn_blocking(move || workspace.perform(action)).await;
    match outcome {
        Ok(Ok(())) => (StatusCode::OK, Json(ControlOk { success: true })).into_response(),
        Ok(Err(err)) => {
            warn!(action = action.as_str(), %err, "control action failed");
            command_failed()
        }
        Err(err) => {
            warn!(%err, "control action task failed");
            command_failed()
        }
    }
}

fn command_failed() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ControlFailure {
            error: "Command failed".to_string(),
        }),
    )
        .into_response()
}

#[derive(Debug, thiserror::Error)]
pub enum ControlApiError {
    #[error("control endpoint failed to start: {0}")]
    Bind(#[from] std::io::Error),
    #[error("control endpoint thread exited before binding")]
    ThreadExited,
}

/// Serve the control endpoint on a dedicated thread with its own
/// current-thread runtime. Returns the bound address, so callers may bind
/// port 0.
pub fn spawn(
    addr: SocketAddr,
    workspace: Arc<dyn WorkspaceActions>,
) -> Result<(SocketAddr, JoinHandle<()>), ControlApiError> {
    let (addr_tx, addr_rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = addr_tx.send(Err(err));
                return;
            }
        };

        runtime.block_on(async move {
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    let _ = addr_tx.send(Err(err));
                    return;
                }
            };
            let local = match listener.local_addr() {
                Ok(local) => local,
                Err(err) => {
                    let _ = addr_tx.send(Err(err));
                    return;
                }
            };
            let _ = addr_tx.send(Ok(local));
            info!(addr = %local, "control endpoint listening");

            if let Err(err) = axum::serve(listener, router(workspace)).await {
                warn!("control endpoint stopped: {err}");
            }
        });
    });

    match addr_rx.recv() {
        Ok(Ok(local)) => Ok((local, handle)),
        Ok(Err(err)) => Err(ControlApiError::Bind(err)),
        Err(_) => Err(ControlApiError::ThreadExited),
    }
}
