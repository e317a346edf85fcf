//! Thread-per-connection workers.
//!
//! Same lifecycle as the process strategy without address-space isolation.
//! Useful where forking is unavailable or too costly.

use std::cell::RefCell;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::worker::{Worker, WorkerError, WorkerStrategy};

#[derive(Debug)]
pub struct ThreadStrategy {
    worker: Arc<Worker>,
    handles: RefCell<Vec<JoinHandle<()>>>,
}

impl ThreadStrategy {
    pub fn new(worker: Worker) -> Self {
        Self {
            worker: Arc::new(worker),
            handles: RefCell::new(Vec::new()),
        }
    }

    /// Threads started and not yet joined.
    pub fn outstanding(&self) -> usize {
        self.handles.borrow().len()
    }
}

impl WorkerStrategy for ThreadStrategy {
    fn spawn(&self, conn: TcpStream, _release_parent: &mut dyn FnMut()) -> Result<(), WorkerError> {
        let worker = Arc::clone(&self.worker);
        let handle = thread::Builder::new()
            .name("scgi-worker".into())
            .spawn(move || {
                let span = tracing::info_span!("worker", thread = ?thread::current().id());
                let _enter = span.enter();
                let exit = worker.serve_stream(conn);
                tracing::debug!(status = exit.code(), "Worker finished");
            })
            .map_err(WorkerError::Spawn)?;

        let mut handles = self.handles.borrow_mut();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        Ok(())
    }

    fn drain(&self) {
        let handles = std::mem::take(&mut *self.handles.borrow_mut());
        let count = handles.len();
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
        tracing::info!(joined = count, "All worker threads finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::context::Context;
    use crate::protocol::{Request, Response};
    use crate::routing::{Route, RouteTable, Router};
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn ping(_: &Context, _: &Request, resp: &mut Response) {
        resp.set_body("pong");
    }

    #[test]
    fn test_thread_serves_and_drains() {
        let worker = Worker::new(
            Arc::new(Router::new(RouteTable::new().route(Route::get("/ping", ping)), "")),
            Arc::new(ServerConfig::default()),
            None,
        );
        let strategy = ThreadStrategy::new(worker);

        let socket = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = TcpStream::connect(socket.local_addr().unwrap()).unwrap();
        let (conn, _) = socket.accept().unwrap();

        let mut released = false;
        strategy.spawn(conn, &mut || released = true).unwrap();
        assert!(!released);

        let block = b"CONTENT_LENGTH\x000\x00REQUEST_METHOD\x00GET\x00DOCUMENT_URI\x00/ping\x00";
        write!(client, "{}:", block.len()).unwrap();
        client.write_all(block).unwrap();
        client.write_all(b",").unwrap();

        let mut reply = String::new();
        client.read_to_string(&mut reply).unwrap();
        assert!(reply.starts_with("Status: 200 OK\r\n"));
        assert!(reply.ends_with("pong"));

        strategy.drain();
        assert_eq!(strategy.outstanding(), 0);
    }
}
