use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use ipcast_broadcast::{PublishError, Publisher};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
/// What a [ScriptedPublisher] does when invoked.
pub enum Script {
    Succeed,
    Fail(String),
    /// Sleeps before succeeding, ignoring cancellation.
    Delay(Duration),
    /// Never completes on its own.
    Hang,
}

/// A publisher following a fixed script, recording every invocation.
pub struct ScriptedPublisher {
    name: String,
    script: Script,
    calls: AtomicUsize,
    received: Mutex<Vec<Vec<String>>>,
}

impl ScriptedPublisher {
    pub fn new(name: &str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script,
            calls: AtomicUsize::new(0),
            received: Mutex::default(),
        })
    }

    pub fn succeeding(name: &str) -> Arc<Self> {
        Self::new(name, Script::Succeed)
    }

    pub fn failing(name: &str, msg: &str) -> Arc<Self> {
        Self::new(name, Script::Fail(msg.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every endpoint set the publisher was invoked with.
    pub fn received(&self) -> Vec<Vec<String>> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(
        &self,
        _cancel: &CancellationToken,
        endpoints: &[String],
    ) -> Result<(), PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(endpoints.to_vec());

        match &self.script {
            Script::Succeed => Ok(()),
            Script::Fail(msg) => Err(PublishError::Other(anyhow!(msg.clone()))),
            Script::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            },
            Script::Hang => std::future::pending().await,
        }
    }
}
