//! Server orchestration.
//!
//! # Responsibilities
//! - Bind the listening socket and open the signal channel
//! - Register the acceptor and the signal listener with one dispatcher
//! - Run the loop until a termination signal arrives
//! - Wait for outstanding workers before returning

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::os::fd::AsRawFd;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::context::AppInitializer;
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::lifecycle::{SignalChannel, SignalError, SignalListener};
use crate::net::{self, ConnectionListener, ListenerError};
use crate::routing::{RouteTable, Router};
use crate::worker::{strategy_for, Worker};

/// Errors raised while setting up or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// SCGI gateway bound to its socket, ready to start.
pub struct Server {
    config: Arc<ServerConfig>,
    router: Arc<Router>,
    app_init: Option<AppInitializer>,
    socket: TcpListener,
    signals: SignalChannel,
    dispatcher: Dispatcher,
}

impl Server {
    /// Bind the configured address and prepare the loop.
    ///
    /// Blocks the control signals on the calling thread; call it from the
    /// thread that will run [`Server::start`], before spawning others.
    pub fn new(config: ServerConfig, routes: RouteTable) -> Result<Self, ServerError> {
        let socket = net::bind(&config.listener)?;
        let signals = SignalChannel::open()?;
        let dispatcher = Dispatcher::new()?;
        let router = Router::new(routes, &config.routing.base_path);

        tracing::info!(
            routes = router.table().len(),
            base_path = %config.routing.base_path,
            mode = ?config.worker.mode,
            "Server initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            router: Arc::new(router),
            app_init: None,
            socket,
            signals,
            dispatcher,
        })
    }

    /// Build per-request application data in every worker.
    pub fn with_app_initializer(mut self, init: AppInitializer) -> Self {
        self.app_init = Some(init);
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until a termination signal arrives, then wait for workers.
    pub fn start(self) -> Result<(), ServerError> {
        let Server {
            config,
            router,
            app_init,
            socket,
            signals,
            mut dispatcher,
        } = self;

        let worker = Worker::new(router, Arc::clone(&config), app_init);
        let strategy = strategy_for(config.worker.mode, worker);

        let socket_fd = socket.as_raw_fd();
        dispatcher.add_listener(
            socket_fd,
            Box::new(ConnectionListener::new(socket, Rc::clone(&strategy))),
        )?;
        let signal_fd = signals.as_raw_fd();
        dispatcher.add_listener(signal_fd, Box::new(SignalListener::new(signals)))?;

        tracing::info!("Waiting for connections");
        let outcome = dispatcher.start();

        tracing::info!("Waiting for workers to finish");
        strategy.drain();

        outcome.map_err(ServerError::from)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.socket.local_addr().ok())
            .field("routes", &self.router.table().len())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
