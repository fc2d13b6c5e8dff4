#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tiny_http::{Response, Server};

/// Status code and body for one request path.
pub type Reply = (u16, Vec<u8>);

/// In-process HTTP server that counts every request it answers.
pub struct TestServer {
    pub base: String,
    hits: Arc<AtomicUsize>,
    server: Arc<Server>,
}

impl TestServer {
    pub fn start<F>(handler: F) -> TestServer
    where
        F: Fn(&str, usize) -> Reply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let server = Arc::new(Server::from_listener(listener, None).expect("start test server"));
        let hits = Arc::new(AtomicUsize::new(0));

        let loop_server = Arc::clone(&server);
        let loop_hits = Arc::clone(&hits);
        thread::spawn(move || {
            for request in loop_server.incoming_requests() {
                let seen = loop_hits.fetch_add(1, Ordering::SeqCst);
                let (status, body) = handler(request.url(), seen);
                let _ = request.respond(Response::from_data(body).with_status_code(status));
            }
        });

        TestServer {
            base: format!("http://{addr}"),
            hits,
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}
