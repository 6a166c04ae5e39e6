//! Scripted transport doubles shared by the behavior tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kronicle_core::{
    ConnectorConfig, ConnectorRole, HttpClient, HttpRequest, HttpResponse, KronicleConnector,
    RetryBudget, Sleeper, TransportError,
};

pub const SERVER: &str = "http://kronicle.test:8000";

pub const ID_A: &str = "0b8f5d2a-1c3e-4a5b-8c7d-9e0f1a2b3c4d";
pub const ID_B: &str = "1c9e6f3b-2d4f-4b6c-9d8e-0f1a2b3c4d5e";
pub const ID_C: &str = "2daf7a4c-3e5a-4c7d-ae9f-1a2b3c4d5e6f";
pub const ID_D: &str = "3eba8b5d-4f6b-4d8e-bfa0-2b3c4d5e6f70";

/// Answers requests from a queue and records what was sent.
#[derive(Default)]
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.push(Ok(HttpResponse::with_status(status, body)))
    }

    pub fn respond_json(&self, body: serde_json::Value) -> &Self {
        self.push(Ok(HttpResponse::ok_json(body.to_string())))
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.push(Err(error))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|request| request.url).collect()
    }

    fn push(&self, entry: Result<HttpResponse, TransportError>) -> &Self {
        self.script.lock().expect("script lock").push_back(entry);
        self
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().expect("requests lock").push(request);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::connect("script exhausted")))
    }
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().expect("delays lock").clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().expect("delays lock").push(duration);
    }
}

/// Connector wired to the scripted client with a recording sleeper.
pub fn connector<R: ConnectorRole + Default>(
    client: &Arc<ScriptedHttpClient>,
    retries: u32,
    delay: Duration,
) -> (KronicleConnector<R>, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let config = ConnectorConfig::new(SERVER)
        .with_retry(RetryBudget::new(retries, delay).expect("valid budget"));
    let connector = KronicleConnector::with_http_client(R::default(), config, client.clone())
        .with_sleeper(sleeper.clone());
    (connector, sleeper)
}
