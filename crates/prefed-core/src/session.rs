//! Editor session over an injected preference backend.
//!
//! The session keeps a sorted snapshot of classified entries, tracks which
//! entry is being edited, and writes edits back through the backend. Hosts
//! observe snapshot changes through [`EditorSession::subscribe`] instead of
//! polling.

use tracing::{debug, info};

use crate::backend::Backend;
use crate::classify::{Variant, classify, describe};
use crate::edit::{CommitOutcome, EditDelegate, EditTarget, EditedValue, Selection, coerce};
use crate::value::StoredValue;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEntry {
    pub key: String,
    pub variant: Variant,
}

impl ClassifiedEntry {
    pub fn preview(&self) -> String {
        describe(&self.variant)
    }
}

/// Classified entries sorted by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<ClassifiedEntry>,
}

impl Snapshot {
    /// Classify a backend dictionary. Output order is by key regardless of
    /// the source's iteration order.
    pub fn build<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (String, StoredValue)>,
    {
        let mut entries: Vec<ClassifiedEntry> = values
            .into_iter()
            .map(|(key, value)| ClassifiedEntry {
                variant: classify(&value),
                key,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Self { entries }
    }

    pub fn entries(&self) -> &[ClassifiedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ClassifiedEntry> {
        self.entries
            .binary_search_by(|e| e.key.as_str().cmp(key))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// `(key, preview)` pairs in display order.
    pub fn rows(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.key.clone(), e.preview()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Selected(Selection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&Snapshot)>;

pub struct EditorSession<B> {
    backend: B,
    entries: Snapshot,
    state: SessionState,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl<B: Backend> EditorSession<B> {
    /// Create a session and load the first snapshot.
    pub fn new(backend: B) -> Self {
        let mut session = Self {
            backend,
            entries: Snapshot::default(),
            state: SessionState::Idle,
            observers: Vec::new(),
            next_subscription: 0,
        };
        session.refresh();
        session
    }

    pub fn entries(&self) -> &Snapshot {
        &self.entries
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn selection(&self) -> Option<&Selection> {
        match &self.state {
            SessionState::Selected(sel) => Some(sel),
            SessionState::Idle => None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Rebuild the snapshot from the backend and notify observers. Any
    /// in-progress selection is dropped.
    pub fn refresh(&mut self) {
        let next = Snapshot::build(self.backend.read());
        self.entries = next;
        self.state = SessionState::Idle;
        debug!(entries = self.entries.len(), "snapshot refreshed");
        for (_, observer) in self.observers.iter_mut() {
            observer(&self.entries);
        }
    }

    /// Start editing `key`. Unknown keys leave the session untouched.
    pub fn select(&mut self, key: &str) -> Option<Selection> {
        let entry = self.entries.get(key)?;
        let selection = Selection {
            key: entry.key.clone(),
            target: EditTarget::for_variant(&entry.variant),
        };
        self.state = SessionState::Selected(selection.clone());
        Some(selection)
    }

    pub fn cancel(&mut self) {
        self.state = SessionState::Idle;
    }

    /// Write an edited value back.
    ///
    /// Plain values are coerced toward the current entry's kind, written and
    /// followed by a refresh. An edited binary-JSON structure is serialized
    /// to bytes and written without a refresh; if it cannot be serialized the
    /// edit is dropped.
    pub fn commit(&mut self, key: &str, edited: impl Into<EditedValue>) -> CommitOutcome {
        self.state = SessionState::Idle;
        match edited.into() {
            EditedValue::Value(value) => {
                let value = match self.entries.get(key) {
                    Some(entry) => coerce(entry.variant.kind(), value),
                    None => value,
                };
                info!(key, kind = value.type_name(), "writing entry");
                self.backend.write(key, value);
                self.refresh();
                CommitOutcome::Written
            }
            EditedValue::Json(map) => {
                let bytes = StoredValue::Dictionary(map)
                    .to_json()
                    .ok()
                    .and_then(|json| serde_json::to_vec(&json).ok());
                match bytes {
                    Some(bytes) => {
                        info!(key, len = bytes.len(), "writing JSON data entry");
                        self.backend.write(key, StoredValue::Data(bytes));
                        CommitOutcome::WrittenWithoutRefresh
                    }
                    None => {
                        debug!(key, "edited JSON cannot be serialized, edit dropped");
                        CommitOutcome::Discarded
                    }
                }
            }
        }
    }

    /// Select `key`, let `delegate` edit it, and commit the result. Returns
    /// `None` when the key is absent or the delegate cancels.
    pub fn edit_with<D>(&mut self, key: &str, delegate: &mut D) -> Option<CommitOutcome>
    where
        D: EditDelegate + ?Sized,
    {
        let selection = self.select(key)?;
        match delegate.edit(&selection) {
            Some(edited) => Some(self.commit(&selection.key, edited)),
            None => {
                self.cancel();
                None
            }
        }
    }

    /// Remove every key, then refresh once.
    pub fn delete<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut removed = 0usize;
        for key in keys {
            self.backend.remove(key.as_ref());
            removed += 1;
        }
        info!(removed, "entries deleted");
        self.refresh();
    }

    /// Register an observer called after every refresh.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&Snapshot) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }
}
