//! Responder double that answers from a queue of canned results.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{ResponderError, Result};
use crate::reply::ResponderReply;
use crate::traits::{Responder, ResponderRequest};

#[derive(Debug)]
enum Scripted {
    Body(String),
    Fail(u16),
    Hang,
}

/// Answers queued bodies in order and records every request it receives
///
/// Bodies go through the same [`ResponderReply`] extraction as the webhook
/// client. An empty queue answers with an HTTP 503 error.
#[derive(Debug, Default)]
pub struct ScriptedResponder {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ResponderRequest>>,
    delay: Option<Duration>,
}

impl ScriptedResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before every answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_body(&self, body: impl Into<String>) {
        self.script.lock().await.push_back(Scripted::Body(body.into()));
    }

    pub async fn push_failure(&self, status: u16) {
        self.script.lock().await.push_back(Scripted::Fail(status));
    }

    /// Next request never answers; pair with a timeout
    pub async fn push_hang(&self) {
        self.script.lock().await.push_back(Scripted::Hang);
    }

    pub async fn requests(&self) -> Vec<ResponderRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn respond(&self, request: ResponderRequest) -> Result<String> {
        self.requests.lock().await.push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().await.pop_front();
        match next {
            Some(Scripted::Body(body)) => Ok(ResponderReply::parse(&body)?.into_text()),
            Some(Scripted::Fail(status)) => Err(ResponderError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            Some(Scripted::Hang) => {
                std::future::pending::<()>().await;
                Err(ResponderError::NoContent)
            }
            None => Err(ResponderError::Status {
                status: 503,
                body: "no scripted reply".to_string(),
            }),
        }
    }
}
