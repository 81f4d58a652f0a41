//! Model acquisition: reading host documents and tracking built models.

use std::sync::{Mutex, MutexGuard};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::{GenError, Result};

/// Decides whether host model data is a structured document and, if so,
/// extracts the model from it.
pub trait ModelReader: Send + Sync {
    /// Whether `data` is in a format this reader understands.
    fn can_read(&self, data: &Value) -> bool;

    /// Parse the full document and return just its model.
    fn read(&self, data: Value) -> Result<Value>;
}

/// A model document as sent by the host: the model plus the profiles it
/// was authored against.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDocument {
    pub model: Value,

    #[serde(default)]
    pub profiles: Vec<Value>,
}

/// Default reader: any object with a `model` member is a [`ModelDocument`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentReader;

impl ModelReader for DocumentReader {
    fn can_read(&self, data: &Value) -> bool {
        data.as_object()
            .is_some_and(|document| document.contains_key("model"))
    }

    fn read(&self, data: Value) -> Result<Value> {
        let document: ModelDocument =
            serde_json::from_value(data).map_err(|e| GenError::Reader(e.to_string()))?;

        tracing::debug!(
            "Read model document with {} profile(s)",
            document.profiles.len()
        );
        Ok(document.model)
    }
}

/// Outcome of a model build, shared with callers waiting on it.
pub(crate) type BuildResult = Option<std::result::Result<Value, String>>;

/// Where the session's built model stands.
pub(crate) enum ModelState {
    /// No `build_model` call yet; models come from the host.
    Absent,
    /// A build is in flight; receivers see `Some` once it settles.
    Building(watch::Receiver<BuildResult>),
    Ready(Value),
    Failed(String),
}

/// Lock the model state, recovering it from a panicked holder.
pub(crate) fn lock_state(state: &Mutex<ModelState>) -> MutexGuard<'_, ModelState> {
    state.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Marks a build in flight for as long as it lives.
///
/// Settling stores the build's final state. A guard dropped unsettled, as
/// when the `build_model` future is cancelled, puts the state back to
/// `Absent` so later lookups go to the host again.
pub(crate) struct BuildGuard<'a> {
    state: &'a Mutex<ModelState>,
    pending: watch::Receiver<BuildResult>,
    settled: bool,
}

impl<'a> BuildGuard<'a> {
    pub(crate) fn start(
        state: &'a Mutex<ModelState>,
        pending: watch::Receiver<BuildResult>,
    ) -> Self {
        *lock_state(state) = ModelState::Building(pending.clone());
        Self {
            state,
            pending,
            settled: false,
        }
    }

    pub(crate) fn settle(mut self, outcome: ModelState) {
        *lock_state(self.state) = outcome;
        self.settled = true;
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = lock_state(self.state);
        if matches!(&*state, ModelState::Building(rx) if rx.same_channel(&self.pending)) {
            tracing::warn!("Model build was dropped before it finished");
            *state = ModelState::Absent;
        }
    }
}

/// Wait for an in-flight build to settle.
pub(crate) async fn wait_for_build(mut rx: watch::Receiver<BuildResult>) -> Result<Value> {
    let settled = rx
        .wait_for(Option::is_some)
        .await
        .map_err(|_| GenError::ModelBuild("model build was abandoned".to_string()))?;

    match &*settled {
        Some(Ok(model)) => Ok(model.clone()),
        Some(Err(message)) => Err(GenError::ModelBuild(message.clone())),
        None => Err(GenError::ModelBuild("model build was abandoned".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_reader_recognizes_documents() {
        let reader = DocumentReader;
        assert!(reader.can_read(&json!({"model": {}, "profiles": []})));
        assert!(!reader.can_read(&json!({"name": "Shop"})));
        assert!(!reader.can_read(&json!([1, 2])));
    }

    #[test]
    fn test_document_reader_extracts_model() {
        let data = json!({
            "profiles": [{"name": "Persistence"}],
            "model": {"name": "Shop", "elements": []}
        });

        let model = DocumentReader.read(data).unwrap();
        assert_eq!(model, json!({"name": "Shop", "elements": []}));
    }

    #[test]
    fn test_document_reader_rejects_bad_profiles() {
        let data = json!({"model": {}, "profiles": "oops"});
        assert!(matches!(DocumentReader.read(data), Err(GenError::Reader(_))));
    }

    #[tokio::test]
    async fn test_wait_for_build_sees_result() {
        let (tx, rx) = watch::channel(None);
        let waiter = tokio::spawn(wait_for_build(rx));

        tx.send_replace(Some(Ok(json!({"built": true}))));
        assert_eq!(waiter.await.unwrap().unwrap(), json!({"built": true}));
    }

    #[test]
    fn test_build_guard_settles() {
        let state = Mutex::new(ModelState::Absent);
        let (_tx, rx) = watch::channel(None);

        let guard = BuildGuard::start(&state, rx);
        assert!(matches!(&*lock_state(&state), ModelState::Building(_)));

        guard.settle(ModelState::Ready(json!({"name": "Shop"})));
        assert!(matches!(&*lock_state(&state), ModelState::Ready(_)));
    }

    #[test]
    fn test_dropped_build_guard_resets_state() {
        let state = Mutex::new(ModelState::Absent);
        let (_tx, rx) = watch::channel(None);

        drop(BuildGuard::start(&state, rx));
        assert!(matches!(&*lock_state(&state), ModelState::Absent));
    }

    #[test]
    fn test_dropped_build_guard_leaves_newer_build() {
        let state = Mutex::new(ModelState::Absent);
        let (_old_tx, old_rx) = watch::channel(None);
        let (_new_tx, new_rx) = watch::channel(None);

        let stale = BuildGuard::start(&state, old_rx);
        let current = BuildGuard::start(&state, new_rx);
        drop(stale);

        assert!(matches!(&*lock_state(&state), ModelState::Building(_)));
        current.settle(ModelState::Failed("boom".to_string()));
        assert!(matches!(&*lock_state(&state), ModelState::Failed(_)));
    }

    #[tokio::test]
    async fn test_wait_for_build_abandoned() {
        let (tx, rx) = watch::channel::<BuildResult>(None);
        drop(tx);
        assert!(matches!(wait_for_build(rx).await, Err(GenError::ModelBuild(_))));
    }
}
