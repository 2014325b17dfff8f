//! Recording transport used by the unit tests

use crate::transport::{Request, Response, TransferError, Transport};
use crate::{Client, ClientBuilder, ClientOptions};
use http::StatusCode;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub(crate) enum Canned {
    Respond(u16, String),
    Fail(TransferError),
}

/// Transport replaying canned answers and recording every request
#[derive(Default)]
pub(crate) struct RecordingTransport {
    answers: Mutex<VecDeque<Canned>>,
    requests: Mutex<Vec<Request>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.answers
            .lock()
            .unwrap()
            .push_back(Canned::Respond(status, body.into()));
        self
    }

    pub fn respond_json(&self, status: u16, body: Value) -> &Self {
        self.respond(status, body.to_string())
    }

    pub fn fail(&self, error: TransferError) -> &Self {
        self.answers.lock().unwrap().push_back(Canned::Fail(error));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> Request {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: Request) -> Result<Response, TransferError> {
        self.requests.lock().unwrap().push(request);
        match self.answers.lock().unwrap().pop_front() {
            Some(Canned::Respond(status, body)) => Ok(Response::from_bytes(
                StatusCode::from_u16(status).unwrap(),
                body.into_bytes(),
            )),
            Some(Canned::Fail(error)) => Err(error),
            None => Ok(Response::from_bytes(StatusCode::OK, b"{}".to_vec())),
        }
    }
}

/// Client against `https://api.example.com` in namespace `default`
pub(crate) fn client_with(transport: &Arc<RecordingTransport>) -> Client {
    ClientBuilder::new()
        .with_options(
            ClientOptions::default()
                .with_master("https://api.example.com")
                .with_token("foo"),
        )
        .with_transport(transport.clone())
        .build()
        .unwrap()
}

pub(crate) fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

pub(crate) fn body_json(request: &Request) -> Value {
    serde_json::from_slice(request.body.as_ref().expect("request has no body")).unwrap()
}
