use crate::error::{FetchError, Result};
use crate::service::ImageryService;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    /// The single handshake attempt failed; every later request fails fast with this message.
    Unavailable(String),
    Closed,
}

/// Lazily initialized handle to the imagery service.
///
/// The handshake runs on first use and is attempted exactly once. `close` (or drop)
/// tears the session down; a closed session never reconnects.
pub struct ServiceSession<S: ImageryService> {
    service: S,
    project_id: String,
    state: SessionState,
}

impl<S: ImageryService> ServiceSession<S> {
    pub fn new(service: S, project_id: &str) -> Self {
        Self {
            service,
            project_id: project_id.to_string(),
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Return the service, initializing it on first call.
    pub fn ensure_ready(&mut self) -> Result<&S> {
        if self.state == SessionState::Uninitialized {
            info!("Initializing imagery service for project {}", self.project_id);
            self.state = match self.service.initialize() {
                Ok(()) => {
                    info!("Imagery service initialized");
                    SessionState::Ready
                }
                Err(e) => {
                    error!("Failed to initialize imagery service: {}", e);
                    SessionState::Unavailable(e.to_string())
                }
            };
        }

        match &self.state {
            SessionState::Ready => Ok(&self.service),
            SessionState::Unavailable(message) => {
                Err(FetchError::ServiceUnavailable(message.clone()))
            }
            SessionState::Closed => Err(FetchError::ServiceUnavailable(
                "session has been closed".to_string(),
            )),
            SessionState::Uninitialized => unreachable!("session state resolved above"),
        }
    }

    pub fn close(&mut self) {
        if self.state == SessionState::Ready {
            self.service.shutdown();
            info!("Imagery service session closed");
        }
        self.state = SessionState::Closed;
    }
}

impl<S: ImageryService> Drop for ServiceSession<S> {
    fn drop(&mut self) {
        if self.state == SessionState::Ready {
            self.service.shutdown();
        }
    }
}
