//! Local HTTP listener for the OAuth callback.
//!
//! A single-shot loopback server: it accepts the provider's consent
//! redirect, hands the parsed query to the authorization flow, writes the
//! rendered page back to the browser, and schedules its own teardown
//! shortly afterwards so the response reaches the browser before the
//! socket goes away.
//!
//! The listener owns an explicit life-cycle state machine. Transition
//! requests from states they do not apply to are no-ops, never errors, and
//! `Exiting` is terminal: it is what the waiting flow blocks on.

use std::io::{BufRead, BufReader, Write as _};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// Listener life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Not yet bound.
    Stopped,
    /// Bound, accept loop not yet running.
    Starting,
    /// Accepting connections.
    Started,
    /// Orderly stop requested; the accept loop is winding down.
    Stopping,
    /// Terminal: the accept loop has finished (or was told to die).
    Exiting,
}

/// Delay between flushing the rendered response and listener teardown.
const SHUTDOWN_DELAY: Duration = Duration::from_secs(1);

/// Accept-loop poll interval while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long a connection waits for the flow to render its page.
const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-connection socket read timeout.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Query parameters extracted from the provider redirect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackQuery {
    /// The anti-CSRF state value echoed back by the provider.
    pub state: Option<String>,
    /// The authorization code, when consent was granted.
    pub code: Option<String>,
    /// The provider's error indicator, when consent failed.
    pub error: Option<String>,
}

/// HTML page written back to the browser.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// HTTP status code.
    pub status: u16,
    /// Page body.
    pub html: String,
}

impl RenderedPage {
    /// A 200 page.
    pub fn ok(html: impl Into<String>) -> Self {
        Self {
            status: 200,
            html: html.into(),
        }
    }

    /// A 400 page.
    pub fn bad_request(html: impl Into<String>) -> Self {
        Self {
            status: 400,
            html: html.into(),
        }
    }
}

/// A parsed callback, paired with the channel its page must be sent on.
///
/// The browser request that carried the callback stays open until
/// [`respond`](Self::respond) delivers the page (or the render timeout
/// elapses and a fallback page is served).
#[derive(Debug)]
pub struct Callback {
    /// The decoded query parameters.
    pub query: CallbackQuery,
    reply: mpsc::Sender<RenderedPage>,
}

impl Callback {
    /// Delivers the rendered page for the pending browser request.
    pub fn respond(self, page: RenderedPage) {
        let _ = self.reply.send(page);
    }
}

/// Listener state cell shared between the controller and the accept loop.
#[derive(Debug)]
struct Shared {
    state: Mutex<ListenerState>,
    cond: Condvar,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(ListenerState::Stopped),
            cond: Condvar::new(),
        }
    }

    fn get(&self) -> ListenerState {
        *self.state.lock().unwrap()
    }

    fn set(&self, next: ListenerState) {
        *self.state.lock().unwrap() = next;
        self.cond.notify_all();
    }

    /// Starting/Started -> Stopping; anything else is a no-op.
    fn request_stop(&self) {
        let mut state = self.state.lock().unwrap();
        match *state {
            ListenerState::Starting | ListenerState::Started => {
                *state = ListenerState::Stopping;
                self.cond.notify_all();
            }
            _ => {}
        }
    }

    /// Any state -> Exiting. Idempotent.
    fn force_exit(&self) {
        let mut state = self.state.lock().unwrap();
        if *state != ListenerState::Exiting {
            *state = ListenerState::Exiting;
            self.cond.notify_all();
        }
    }
}

/// The loopback callback server.
pub struct CallbackServer {
    shared: Arc<Shared>,
    addr: SocketAddr,
}

impl CallbackServer {
    /// Binds the listener and starts the accept loop on its own thread.
    ///
    /// `path` is the redirect path the provider will call back on;
    /// everything else gets a 404. Parsed callbacks are forwarded on
    /// `callbacks`.
    pub fn start(
        host: &str,
        port: u16,
        path: impl Into<String>,
        callbacks: UnboundedSender<Callback>,
    ) -> ProviderResult<Self> {
        let shared = Arc::new(Shared::new());
        shared.set(ListenerState::Starting);

        let listener = TcpListener::bind((host, port)).map_err(|e| {
            ProviderError::configuration(format!("failed to bind {}:{}: {}", host, port, e))
        })?;
        listener.set_nonblocking(true).map_err(|e| {
            ProviderError::internal(format!("failed to set listener non-blocking: {}", e))
        })?;
        let addr = listener
            .local_addr()
            .map_err(|e| ProviderError::internal(format!("failed to read local addr: {}", e)))?;

        debug!("callback listener bound on {}", addr);

        let path = path.into();
        thread::spawn({
            let shared = Arc::clone(&shared);
            move || accept_loop(listener, shared, path, callbacks)
        });

        Ok(Self { shared, addr })
    }

    /// Returns the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the current listener state.
    pub fn state(&self) -> ListenerState {
        self.shared.get()
    }

    /// Requests an orderly stop.
    ///
    /// No-op unless the listener is starting or started; calling it on an
    /// already stopping, exiting or stopped listener does nothing.
    pub fn shutdown(&self) {
        self.shared.request_stop();
    }

    /// Drives the listener straight to `Exiting`.
    ///
    /// Used on interrupt, where there is no response left to flush.
    /// Idempotent.
    pub fn exit(&self) {
        self.shared.force_exit();
    }

    /// Blocks until the listener reaches `Exiting`.
    ///
    /// Returns false if the timeout elapsed first.
    pub fn wait_exited(&self, timeout: Duration) -> bool {
        let guard = self.shared.state.lock().unwrap();
        let (_guard, result) = self
            .shared
            .cond
            .wait_timeout_while(guard, timeout, |state| *state != ListenerState::Exiting)
            .unwrap();
        !result.timed_out()
    }
}

/// Accepts connections until a stop or exit is requested.
fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    path: String,
    callbacks: UnboundedSender<Callback>,
) {
    shared.set(ListenerState::Started);
    let mut answered = false;

    loop {
        match shared.get() {
            ListenerState::Stopping | ListenerState::Exiting => break,
            _ => {}
        }

        match listener.accept() {
            Ok((stream, peer)) => {
                debug!("callback connection from {}", peer);
                handle_connection(stream, &path, &callbacks, &shared, &mut answered);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                warn!("failed to accept connection: {}", e);
            }
        }
    }

    shared.force_exit();
    debug!("callback listener exited");
}

/// Serves one connection.
///
/// The first request hitting the redirect path is forwarded to the flow and
/// answered with whatever page it renders; afterwards a delayed stop is
/// scheduled on a timer thread so the response is flushed before teardown.
fn handle_connection(
    mut stream: TcpStream,
    expected_path: &str,
    callbacks: &UnboundedSender<Callback>,
    shared: &Arc<Shared>,
    answered: &mut bool,
) {
    // The accepted socket must block; the listener itself is non-blocking.
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(READ_TIMEOUT));

    let request_line = {
        let mut reader = BufReader::new(&stream);
        let mut line = String::new();
        if reader.read_line(&mut line).is_err() {
            return;
        }
        // Drain the request headers so the peer is not cut off mid-send.
        let mut header = String::new();
        while reader.read_line(&mut header).is_ok() {
            if header.trim_end().is_empty() {
                break;
            }
            header.clear();
        }
        line
    };

    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => (method, target),
        _ => return,
    };
    if method != "GET" {
        write_response(&mut stream, 404, NOT_FOUND_HTML);
        return;
    }

    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != expected_path {
        write_response(&mut stream, 404, NOT_FOUND_HTML);
        return;
    }

    if *answered {
        write_response(&mut stream, 200, ALREADY_ANSWERED_HTML);
        return;
    }

    let (reply_tx, reply_rx) = mpsc::channel();
    let callback = Callback {
        query: parse_query(query),
        reply: reply_tx,
    };

    let page = if callbacks.send(callback).is_ok() {
        reply_rx
            .recv_timeout(RENDER_TIMEOUT)
            .unwrap_or_else(|_| RenderedPage::bad_request(FALLBACK_HTML))
    } else {
        // The flow is gone (interrupted); nothing left to exchange.
        RenderedPage::bad_request(FALLBACK_HTML)
    };

    *answered = true;
    write_response(&mut stream, page.status, &page.html);

    // Stop on a timer thread so the response above reaches the browser.
    let shared = Arc::clone(shared);
    thread::spawn(move || {
        thread::sleep(SHUTDOWN_DELAY);
        shared.request_stop();
    });
}

/// Decodes the redirect query string.
fn parse_query(query: &str) -> CallbackQuery {
    let mut parsed = CallbackQuery::default();
    for param in query.split('&') {
        let mut kv = param.splitn(2, '=');
        if let (Some(key), Some(value)) = (kv.next(), kv.next()) {
            let value = urlencoding::decode(value).unwrap_or_default().into_owned();
            match key {
                "state" => parsed.state = Some(value),
                "code" => parsed.code = Some(value),
                "error" => parsed.error = Some(value),
                _ => {}
            }
        }
    }
    parsed
}

/// Writes a minimal HTTP/1.1 response and flushes it.
fn write_response(stream: &mut TcpStream, status: u16, html: &str) {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "OK",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        html.len(),
        html
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

const NOT_FOUND_HTML: &str = "<html><body><h1>Not Found</h1></body></html>";

const ALREADY_ANSWERED_HTML: &str =
    "<html><body><h1>Authorization result already received</h1>\
     <h3>You can close this window</h3></body></html>";

const FALLBACK_HTML: &str = "<html><body><h1>ERROR: authorization flow is not available</h1>\
     <h3>You can close this window</h3></body></html>";

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write as _};

    fn wait_for_state(server: &CallbackServer, wanted: ListenerState) {
        for _ in 0..100 {
            if server.state() == wanted {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("listener never reached {:?}", wanted);
    }

    fn send_request(addr: SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", target).as_bytes())
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn parse_query_decodes_parameters() {
        let query = parse_query("state=abc%20def&code=XYZ&other=1");
        assert_eq!(query.state.as_deref(), Some("abc def"));
        assert_eq!(query.code.as_deref(), Some("XYZ"));
        assert!(query.error.is_none());
    }

    #[test]
    fn parse_query_empty() {
        assert_eq!(parse_query(""), CallbackQuery::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn forwards_callback_and_writes_page() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let server = CallbackServer::start("127.0.0.1", 0, "/", tx).unwrap();
        wait_for_state(&server, ListenerState::Started);

        let addr = server.addr();
        let browser = thread::spawn(move || send_request(addr, "/?state=s1&code=c1"));

        let callback = rx.recv().await.unwrap();
        assert_eq!(callback.query.code.as_deref(), Some("c1"));
        assert_eq!(callback.query.state.as_deref(), Some("s1"));
        callback.respond(RenderedPage::ok("<h1>done</h1>"));

        let response = browser.join().unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("<h1>done</h1>"));

        // The delayed stop must drive the listener to Exiting on its own.
        assert!(server.wait_exited(Duration::from_secs(5)));
        assert_eq!(server.state(), ListenerState::Exiting);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_matching_path_gets_404_and_keeps_listening() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let server = CallbackServer::start("127.0.0.1", 0, "/callback", tx).unwrap();
        wait_for_state(&server, ListenerState::Started);

        let response = send_request(server.addr(), "/favicon.ico");
        assert!(response.starts_with("HTTP/1.1 404"));
        assert_eq!(server.state(), ListenerState::Started);
        assert!(rx.try_recv().is_err());

        server.shutdown();
        assert!(server.wait_exited(Duration::from_secs(2)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_callback_gets_already_answered_page() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let server = CallbackServer::start("127.0.0.1", 0, "/", tx).unwrap();
        wait_for_state(&server, ListenerState::Started);

        let addr = server.addr();
        let browser = thread::spawn(move || send_request(addr, "/?state=s&code=c"));
        rx.recv().await.unwrap().respond(RenderedPage::ok("first"));
        browser.join().unwrap();

        let response = send_request(addr, "/?state=s&code=c");
        assert!(response.contains("already received"));
        assert!(rx.try_recv().is_err());

        assert!(server.wait_exited(Duration::from_secs(5)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_is_idempotent() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let server = CallbackServer::start("127.0.0.1", 0, "/", tx).unwrap();
        wait_for_state(&server, ListenerState::Started);

        server.shutdown();
        assert!(server.wait_exited(Duration::from_secs(2)));
        server.shutdown();
        server.shutdown();
        assert_eq!(server.state(), ListenerState::Exiting);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exit_goes_straight_to_exiting() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let server = CallbackServer::start("127.0.0.1", 0, "/", tx).unwrap();
        wait_for_state(&server, ListenerState::Started);

        server.exit();
        assert!(server.wait_exited(Duration::from_secs(2)));
        server.exit();
        assert_eq!(server.state(), ListenerState::Exiting);
    }
}
