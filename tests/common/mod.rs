//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves scripted routes: each path has a body, an artificial latency, an
//! optional count of initial failures and a response status. The server
//! also tracks the high-water mark of concurrently handled requests, which
//! the budget-invariant test asserts against.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Behavior of one served path.
#[derive(Debug, Clone)]
pub struct Route {
    /// Response body for successful requests.
    pub body: Vec<u8>,
    /// Artificial latency before the response is written.
    pub delay: Duration,
    /// Respond 500 to this many requests before succeeding.
    pub fail_first: usize,
    /// Status for non-failing responses (e.g. 404 for a permanent gap).
    pub status: u16,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            body: Vec::new(),
            delay: Duration::ZERO,
            fail_first: 0,
            status: 200,
        }
    }
}

struct RouteState {
    route: Route,
    hits: usize,
}

struct ServerState {
    routes: Mutex<HashMap<String, RouteState>>,
    active: AtomicUsize,
    high_water: AtomicUsize,
}

/// Scripted HTTP server bound to an ephemeral localhost port.
///
/// Runs in background threads until the process exits, the same pattern as
/// a per-test fixture: start, add routes, point the client at `url()`.
pub struct FixtureServer {
    base_url: String,
    state: Arc<ServerState>,
}

impl FixtureServer {
    /// Start a server with no routes; unknown paths get 404.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();

        let state = Arc::new(ServerState {
            routes: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        });

        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&accept_state);
                thread::spawn(move || handle(stream, &state));
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    /// Absolute URL for a path (path must start with '/').
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register or replace a route.
    pub fn add_route(&self, path: &str, route: Route) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(path.to_string(), RouteState { route, hits: 0 });
    }

    /// Register a text route with no latency, e.g. a manifest.
    pub fn add_text(&self, path: &str, body: &str) {
        self.add_route(
            path,
            Route {
                body: body.as_bytes().to_vec(),
                ..Default::default()
            },
        );
    }

    /// Requests seen by a path so far.
    pub fn hits(&self, path: &str) -> usize {
        self.state
            .routes
            .lock()
            .unwrap()
            .get(path)
            .map(|r| r.hits)
            .unwrap_or(0)
    }

    /// Maximum number of requests that were in flight at the same time.
    pub fn high_water(&self) -> usize {
        self.state.high_water.load(Ordering::SeqCst)
    }
}

fn handle(mut stream: TcpStream, state: &ServerState) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));

    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let path = match parse_path(request) {
        Some(path) => path,
        None => return,
    };

    // Decide the response under the lock, then serve it outside of it so
    // concurrent requests genuinely overlap.
    let decision = {
        let mut routes = state.routes.lock().unwrap();
        match routes.get_mut(&path) {
            Some(entry) => {
                entry.hits += 1;
                if entry.hits <= entry.route.fail_first {
                    Some((500, Vec::new(), entry.route.delay))
                } else {
                    Some((
                        entry.route.status,
                        entry.route.body.clone(),
                        entry.route.delay,
                    ))
                }
            }
            None => None,
        }
    };

    let (status, body, delay) = decision.unwrap_or((404, Vec::new(), Duration::ZERO));

    let now_active = state.active.fetch_add(1, Ordering::SeqCst) + 1;
    state.high_water.fetch_max(now_active, Ordering::SeqCst);

    thread::sleep(delay);

    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);

    state.active.fetch_sub(1, Ordering::SeqCst);
}

fn parse_path(request: &str) -> Option<String> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let _method = parts.next()?;
    let target = parts.next()?;
    // Strip any query string; routes are keyed by path only.
    Some(target.split('?').next().unwrap_or(target).to_string())
}
