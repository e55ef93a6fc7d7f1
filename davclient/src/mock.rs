// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! A scripted [`Transport`] for tests.
//!
//! Replies are returned in the order they were queued, and every request is recorded so tests can
//! inspect what went over the wire.
use std::{collections::VecDeque, sync::Mutex, time::Duration};

use async_trait::async_trait;
use futures::future::AbortHandle;
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use hyper::body::Bytes;

use crate::{dav::DavError, transport::Transport};

/// A request as received by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Debug)]
enum Reply {
    Respond(Response<Bytes>),
    Timeout,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    abort_on: Mutex<Option<(Method, AbortHandle)>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> MockTransport {
        MockTransport::default()
    }

    /// Queues a response with the given status and body.
    pub fn respond(&self, status: StatusCode, body: &str) -> &Self {
        self.respond_with_headers(status, &[], body)
    }

    /// Queues a response with the given status, headers and body.
    pub fn respond_with_headers(
        &self,
        status: StatusCode,
        headers: &[(&'static str, &str)],
        body: &str,
    ) -> &Self {
        let mut builder = Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let response = builder
            .body(Bytes::from(body.to_string()))
            .expect("scripted response is valid");
        self.lock_replies().push_back(Reply::Respond(response));
        self
    }

    /// Queues a failure where the server never answers.
    pub fn time_out(&self) -> &Self {
        self.lock_replies().push_back(Reply::Timeout);
        self
    }

    /// Triggers `handle` when a request with `method` is received.
    pub fn abort_on(&self, method: Method, handle: AbortHandle) {
        *self.abort_on.lock().expect("mock lock is not poisoned") = Some((method, handle));
    }

    /// All requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("mock lock is not poisoned")
            .clone()
    }

    /// Amount of requests received with `method`.
    #[must_use]
    pub fn count(&self, method: &Method) -> usize {
        self.requests()
            .iter()
            .filter(|request| &request.method == method)
            .count()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Reply>> {
        self.replies.lock().expect("mock lock is not poisoned")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, DavError> {
        let (head, body) = request.into_parts();
        self.requests
            .lock()
            .expect("mock lock is not poisoned")
            .push(RecordedRequest {
                method: head.method.clone(),
                uri: head.uri,
                headers: head.headers,
                body: String::from_utf8_lossy(&body).into_owned(),
            });

        if let Some((method, handle)) = &*self.abort_on.lock().expect("mock lock is not poisoned")
        {
            if *method == head.method {
                handle.abort();
            }
        }

        match self.lock_replies().pop_front() {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Timeout) => Err(DavError::Timeout(Duration::from_secs(30))),
            None => Err(DavError::InvalidResponse(
                format!("no scripted reply for {}", head.method).into(),
            )),
        }
    }
}
