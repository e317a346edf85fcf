//! The single-request lifecycle executed by every worker.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::context::{AppInitializer, Context};
use crate::protocol::{self, Response};
use crate::routing::Router;

/// Outcome of one exchange, used as the worker's exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Response sent.
    Served,
    /// The request could not be read or parsed; nothing was sent.
    ReadFailed,
    /// The response could not be written.
    SendFailed,
    /// A filter or handler panicked.
    Panicked,
}

impl WorkerExit {
    pub fn code(self) -> i32 {
        match self {
            WorkerExit::Served => 0,
            WorkerExit::ReadFailed => 1,
            WorkerExit::SendFailed => 2,
            WorkerExit::Panicked => 3,
        }
    }
}

/// Everything a worker needs to serve one connection.
///
/// Cloned into threads or copied into forked children; never mutated.
#[derive(Debug, Clone)]
pub struct Worker {
    router: Arc<Router>,
    config: Arc<ServerConfig>,
    app_init: Option<AppInitializer>,
}

impl Worker {
    pub fn new(router: Arc<Router>, config: Arc<ServerConfig>, app_init: Option<AppInitializer>) -> Self {
        Self {
            router,
            config,
            app_init,
        }
    }

    /// Switch an accepted socket to blocking mode, apply the read timeout and serve it.
    pub fn serve_stream(&self, conn: TcpStream) -> WorkerExit {
        let prepared = conn
            .set_nonblocking(false)
            .and_then(|()| conn.set_read_timeout(self.config.worker.read_timeout()));
        if let Err(e) = prepared {
            tracing::warn!(error = %e, "Could not prepare connection");
            return WorkerExit::ReadFailed;
        }
        self.run(conn)
    }

    /// Serve one exchange, containing panics raised by filters or handlers.
    pub fn run<S: Read + Write>(&self, conn: S) -> WorkerExit {
        match panic::catch_unwind(AssertUnwindSafe(|| self.serve(conn))) {
            Ok(exit) => exit,
            Err(_) => {
                tracing::error!("Request handler panicked");
                WorkerExit::Panicked
            }
        }
    }

    fn serve<S: Read + Write>(&self, mut conn: S) -> WorkerExit {
        let request = match protocol::read_request(&mut conn, &self.config.request_limits()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read request");
                return WorkerExit::ReadFailed;
            }
        };

        let app_data = self.app_init.map(|init| init());
        let ctx = Context::new(Arc::clone(&self.config), app_data);

        tracing::debug!(
            method = %request.method(),
            route = request.route(),
            "Request received"
        );

        let mut response = Response::new();
        self.router.dispatch(&ctx, &request, &mut response);

        let status = response.status();
        if let Err(e) = response.send(&mut conn) {
            tracing::warn!(error = %e, "Could not send response");
            return WorkerExit::SendFailed;
        }

        tracing::debug!(status = status.as_u16(), "Response sent");
        WorkerExit::Served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::scgi::encode_request;
    use crate::protocol::{Request, StatusCode};
    use crate::routing::{Route, RouteTable};
    use std::io::Cursor;

    /// In-memory connection: reads a scripted request, records the response.
    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Duplex {
        fn new(input: Vec<u8>) -> Self {
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
            }
        }
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn hello(ctx: &Context, _: &Request, resp: &mut Response) {
        let visits = ctx.app_data::<u32>().copied().unwrap_or_default();
        write!(resp, "hello {}", visits).unwrap();
    }

    fn boom(_: &Context, _: &Request, _: &mut Response) {
        panic!("handler failure");
    }

    fn seven() -> crate::context::AppData {
        Box::new(7u32)
    }

    fn worker(app_init: Option<AppInitializer>) -> Worker {
        let table = RouteTable::new()
            .route(Route::get("/hello", hello))
            .route(Route::get("/boom", boom));
        Worker::new(
            Arc::new(Router::new(table, "/app")),
            Arc::new(ServerConfig::default()),
            app_init,
        )
    }

    fn exchange(worker: &Worker, path: &str) -> (WorkerExit, String) {
        let wire = encode_request(&[("REQUEST_METHOD", "GET"), ("DOCUMENT_URI", path)], b"");
        let mut conn = Duplex::new(wire);
        let exit = worker.run(&mut conn);
        (exit, String::from_utf8(conn.output).unwrap())
    }

    #[test]
    fn test_served_with_app_data() {
        let (exit, out) = exchange(&worker(Some(seven)), "/app/hello");
        assert_eq!(exit, WorkerExit::Served);
        assert_eq!(exit.code(), 0);
        assert!(out.starts_with("Status: 200 OK\r\n"));
        assert!(out.ends_with("hello 7"));

        let (_, out) = exchange(&worker(None), "/app/hello");
        assert!(out.ends_with("hello 0"));
    }

    #[test]
    fn test_unmatched_route_gets_404() {
        let (exit, out) = exchange(&worker(None), "/app/missing");
        assert_eq!(exit, WorkerExit::Served);
        assert!(out.starts_with(&format!("Status: {}\r\n", StatusCode::NOT_FOUND)));
        assert!(out.ends_with("Content-Length: 0\r\n\r\n"));
    }

    #[test]
    fn test_unreadable_request_gets_no_response() {
        let mut conn = Duplex::new(b"garbage".to_vec());
        let exit = worker(None).run(&mut conn);

        assert_eq!(exit, WorkerExit::ReadFailed);
        assert_ne!(exit.code(), 0);
        assert!(conn.output.is_empty());
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let (exit, out) = exchange(&worker(None), "/app/boom");
        assert_eq!(exit, WorkerExit::Panicked);
        assert_eq!(exit.code(), 3);
        assert!(out.is_empty());
    }
}
