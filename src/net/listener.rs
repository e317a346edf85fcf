//! Listening socket setup.

use std::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to configure the bound socket.
    Configure(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Configure(e) => write!(f, "Failed to configure listener: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind(e) | ListenerError::Configure(e) => Some(e),
        }
    }
}

/// Bind the configured address and switch the socket to non-blocking mode.
///
/// The accept loop relies on `WouldBlock` to know the backlog is drained.
pub fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let listener =
        TcpListener::bind((config.address.as_str(), config.port)).map_err(ListenerError::Bind)?;
    listener
        .set_nonblocking(true)
        .map_err(ListenerError::Configure)?;

    let local_addr = listener.local_addr().map_err(ListenerError::Configure)?;
    tracing::info!(address = %local_addr, "Listener bound");

    Ok(listener)
}
