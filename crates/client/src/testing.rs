//! Scripted [`HttpBackend`] for tests.
//!
//! Replies are queued per `(method, url)`. Each request pops the next
//! reply for its route; the last reply of a route repeats forever, so a
//! polling loop can be scripted as `[pending, pending, done]`. Requests
//! with no route get a JSON 404.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{HttpBackend, HttpRequest, HttpResponse, Method, NetworkError};

/// One scripted outcome of an exchange.
#[derive(Debug, Clone)]
pub enum Reply {
    Response(HttpResponse),
    Network(String),
}

impl Reply {
    /// `200` with a JSON body.
    pub fn json(body: Value) -> Self {
        Self::Response(HttpResponse::new(200, body.to_string().into_bytes()))
    }

    /// `status` with a JSON body.
    pub fn status(status: u16, body: Value) -> Self {
        Self::Response(HttpResponse::new(status, body.to_string().into_bytes()))
    }

    /// `200` with a raw body.
    pub fn bytes(body: impl Into<Vec<u8>>) -> Self {
        Self::Response(HttpResponse::new(200, body.into()))
    }

    /// The request never reaches the server.
    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network(reason.into())
    }
}

#[derive(Default)]
struct State {
    routes: HashMap<(Method, String), VecDeque<Reply>>,
    requests: Vec<HttpRequest>,
}

/// In-memory backend answering from per-route reply scripts.
#[derive(Default)]
pub struct ScriptedBackend {
    state: Mutex<State>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the replies for `method url`, replacing any earlier script.
    pub fn on(&self, method: Method, url: &str, replies: impl IntoIterator<Item = Reply>) -> &Self {
        self.lock()
            .routes
            .insert((method, url.to_string()), replies.into_iter().collect());
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests received for `method url`.
    pub fn count(&self, method: Method, url: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HttpBackend for ScriptedBackend {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let mut state = self.lock();
        let key = (request.method, request.url.clone());
        state.requests.push(request);

        let reply = match state.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Network(reason)) => Err(NetworkError(reason)),
            None => Ok(HttpResponse::new(
                404,
                serde_json::json!({ "message": "No route scripted" })
                    .to_string()
                    .into_bytes(),
            )),
        }
    }
}
