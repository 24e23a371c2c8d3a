//! Scripted in-memory `TextGenerator` for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::Semaphore;

use crate::llm_client::{FragmentStream, LlmError, TextGenerator};

/// What a scripted stream does once opened.
#[derive(Debug, Clone)]
pub enum Script {
    /// Yields the fragments, then ends.
    Fragments(Vec<String>),
    /// Yields the fragments, then a service error.
    FailAfter(Vec<String>),
    /// `stream_generate` itself fails.
    FailToOpen,
    /// Yields the fragments, then never yields again.
    PendingAfter(Vec<String>),
}

impl Script {
    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Script::Fragments(fragments.into_iter().map(Into::into).collect())
    }

    pub fn fail_after<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Script::FailAfter(fragments.into_iter().map(Into::into).collect())
    }

    pub fn pending_after<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Script::PendingAfter(fragments.into_iter().map(Into::into).collect())
    }

    fn open(self) -> Result<FragmentStream, LlmError> {
        let ok = |fragments: Vec<String>| {
            stream::iter(fragments.into_iter().map(Ok::<String, LlmError>))
        };
        match self {
            Script::Fragments(fragments) => Ok(ok(fragments).boxed()),
            Script::FailAfter(fragments) => Ok(ok(fragments)
                .chain(stream::once(async { Err(service_error()) }))
                .boxed()),
            Script::FailToOpen => Err(service_error()),
            Script::PendingAfter(fragments) => Ok(ok(fragments).chain(stream::pending()).boxed()),
        }
    }
}

/// Counts streams dropped by their consumer.
struct DropGuard(Arc<AtomicUsize>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn service_error() -> LlmError {
    LlmError::Api {
        status: 503,
        message: "The model is overloaded. Please try again later.".to_string(),
    }
}

/// Routes streams by system instruction: the certification consultant prompt
/// gets the certification script, everything else the interview script.
///
/// Interview scripts are consumed in order, one per stream; the last one repeats.
pub struct ScriptedGenerator {
    verdict: Option<String>,
    /// When set, each classify call waits for one permit before answering.
    classify_gate: Option<Semaphore>,
    interview: Mutex<Vec<Script>>,
    certification: Script,
    classify_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    dropped_streams: Arc<AtomicUsize>,
    classify_log: Mutex<Vec<(String, f32)>>,
    stream_log: Mutex<Vec<(String, String, f32)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            verdict: Some("VALID".to_string()),
            classify_gate: None,
            interview: Mutex::new(vec![Script::Fragments(vec![])]),
            certification: Script::Fragments(vec![]),
            classify_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            dropped_streams: Arc::new(AtomicUsize::new(0)),
            classify_log: Mutex::new(Vec::new()),
            stream_log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_verdict(mut self, verdict: &str) -> Self {
        self.verdict = Some(verdict.to_string());
        self
    }

    pub fn with_failing_classifier(mut self) -> Self {
        self.verdict = None;
        self
    }

    /// Classify calls block until `release_classifier` lets them answer.
    pub fn with_held_classifier(mut self) -> Self {
        self.classify_gate = Some(Semaphore::new(0));
        self
    }

    pub fn release_classifier(&self, calls: usize) {
        if let Some(gate) = &self.classify_gate {
            gate.add_permits(calls);
        }
    }

    pub fn with_interview(self, script: Script) -> Self {
        *self.interview.lock().unwrap() = vec![script];
        self
    }

    /// Queues a script for the next interview stream after the ones already set.
    pub fn then_interview(self, script: Script) -> Self {
        self.interview.lock().unwrap().push(script);
        self
    }

    pub fn with_certification(mut self, script: Script) -> Self {
        self.certification = script;
        self
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn dropped_streams(&self) -> usize {
        self.dropped_streams.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.classify_calls() + self.stream_calls()
    }

    pub fn last_classify(&self) -> Option<(String, f32)> {
        self.classify_log.lock().unwrap().last().cloned()
    }

    pub fn last_stream(&self) -> Option<(String, String, f32)> {
        self.stream_log.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn classify(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.classify_log
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));
        if let Some(gate) = &self.classify_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.verdict.clone().ok_or_else(service_error)
    }

    async fn stream_generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<FragmentStream, LlmError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.stream_log.lock().unwrap().push((
            prompt.to_string(),
            system_instruction.to_string(),
            temperature,
        ));
        let script = if system_instruction.contains("Certification Consultant") {
            self.certification.clone()
        } else {
            let mut scripts = self.interview.lock().unwrap();
            if scripts.len() > 1 {
                scripts.remove(0)
            } else {
                scripts[0].clone()
            }
        };
        let guard = DropGuard(self.dropped_streams.clone());
        let stream = script.open()?;
        Ok(stream
            .map(move |item| {
                let _alive = &guard;
                item
            })
            .boxed())
    }
}
