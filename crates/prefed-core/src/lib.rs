//! prefed-core: classification, preview and editing of preference stores
//!
//! This crate focuses on a small, well-factored surface:
//! - Dynamic value model for whatever a preference store hands back
//! - Ordered classifier into semantic variants, plus display previews
//! - Editor session: sorted snapshot, select/commit/delete, observers
//! - Backends (trait, closures, in-memory) and a JSON file store with backups
//!
pub mod backend;
pub mod classify;
pub mod config;
pub mod edit;
pub mod error;
pub mod sample;
pub mod session;
pub mod store;
pub mod value;

pub use backend::{Backend, FnBackend, MemoryStore};
pub use classify::{Variant, VariantKind, classify, describe};
pub use edit::{
    CommitOutcome, EditDelegate, EditTarget, EditedValue, Selection, coerce, edit_text, parse_for,
    parse_kind,
};
pub use error::{ParseError, StoreError, ValueError};
pub use session::{ClassifiedEntry, EditorSession, SessionState, Snapshot, SubscriptionId};
pub use store::{FileStore, list_stores, zip_backup};
pub use value::{Number, OpaqueValue, StoredValue};
