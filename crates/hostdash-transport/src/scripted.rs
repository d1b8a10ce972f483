//! A transport that replays canned responses.
//!
//! Used by the test suites of every crate above this one, and handy for
//! running the dashboard core offline.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    ApiRequest, ApiResponse, HttpTransport, Method, TransportError,
    request_path,
};

#[derive(Debug, Clone)]
enum Reply {
    Respond(ApiResponse),
    Fail(String),
}

/// Replays scripted replies keyed by `(method, path)` and records every
/// request it sees.
///
/// Replies for a route are served in the order they were scripted. The
/// last reply is sticky: once the queue is down to one entry it is
/// served for every further call.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a JSON response for `method path`.
    pub fn respond(
        &self,
        method: Method,
        path: &str,
        status: u16,
        body: serde_json::Value,
    ) -> &Self {
        self.push(method, path, Reply::Respond(ApiResponse::json(status, &body)))
    }

    /// Queues a response with an empty body.
    pub fn respond_empty(&self, method: Method, path: &str, status: u16) -> &Self {
        self.push(method, path, Reply::Respond(ApiResponse::new(status, "")))
    }

    /// Queues a transport-level failure (no response at all).
    pub fn fail(&self, method: Method, path: &str, reason: &str) -> &Self {
        self.push(method, path, Reply::Fail(reason.to_string()))
    }

    fn push(&self, method: Method, path: &str, reply: Reply) -> &Self {
        lock(&self.routes)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request received so far, in arrival order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        lock(&self.calls).clone()
    }

    /// How many requests hit `method path`.
    pub fn call_count(&self, method: Method, path: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|r| r.method == method && request_path(&r.url) == path)
            .count()
    }

    /// Total number of requests received.
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).len()
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<Reply> {
        let mut routes = lock(&self.routes);
        let queue = routes.get_mut(&(method, path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl HttpTransport for ScriptedTransport {
    async fn send(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse, TransportError> {
        let method = request.method;
        let url = request.url.clone();
        let path = request_path(&url).to_string();
        lock(&self.calls).push(request);

        // A real round trip is a suspension point; keep that property so
        // concurrent callers interleave the way they would in production.
        tokio::task::yield_now().await;

        match self.next_reply(method, &path) {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(reason)) => {
                Err(TransportError::RequestFailed { url, reason })
            }
            None => Err(TransportError::RequestFailed {
                url,
                reason: format!("no scripted reply for {method} {path}"),
            }),
        }
    }
}
