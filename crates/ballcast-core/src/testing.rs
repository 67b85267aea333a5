//! In-memory collaborators for unit tests

use crate::{
    catalog::EventCatalog, error::FetchError, prober::ManifestFetcher, types::Schedule, Error,
    Result as CoreResult,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const TEMPLATE: &str = "https://cdn.example/{date}/{feedIdentifier}/{cdnVariant}/master.m3u8";

/// Answers from a fixed table of URL -> response; unknown URLs get a 404
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: HashMap<String, Result<String, FetchError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn fail(mut self, url: &str, error: FetchError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    /// Sleep before answering every request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManifestFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::Status(404)))
    }
}

/// Hands out scripted schedules in order, then fails
pub struct ScriptedCatalog {
    results: Mutex<VecDeque<CoreResult<Schedule>>>,
    repeat: Option<Schedule>,
    loads: AtomicUsize,
}

impl ScriptedCatalog {
    pub fn new(results: Vec<CoreResult<Schedule>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            repeat: None,
            loads: AtomicUsize::new(0),
        }
    }

    /// Return the same schedule on every load
    pub fn repeating(schedule: Schedule) -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            repeat: Some(schedule),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventCatalog for ScriptedCatalog {
    async fn load(&self) -> CoreResult<Schedule> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        if let Some(schedule) = &self.repeat {
            return Ok(schedule.clone());
        }

        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Internal("catalog script exhausted".into())))
    }
}
