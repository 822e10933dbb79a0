#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatbot::chat::{CompletionRequest, CompletionService, Fragment, FragmentStream};
use chatbot::{Error, Result};

pub enum Script {
    /// `stream()` itself fails.
    Reject(Error),
    /// `stream()` succeeds and yields these items in order.
    Items(Vec<Result<Fragment>>),
}

impl Script {
    pub fn texts(texts: &[&str]) -> Self {
        Script::Items(texts.iter().map(|t| Ok(Fragment::text(*t))).collect())
    }
}

pub fn service_error(message: &str) -> Error {
    Error::ApiError {
        status: 500,
        message: message.to_string(),
    }
}

/// Completion service answering each call with the next queued script.
#[derive(Clone, Default)]
pub struct ScriptedService {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedService {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into_iter().collect())),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Items(items)) => Ok(Box::pin(futures::stream::iter(items))),
            Some(Script::Reject(err)) => Err(err),
            None => Err(Error::OtherError("no scripted response left".into())),
        }
    }
}
