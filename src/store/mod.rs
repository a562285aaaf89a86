//! In-process row storage
//!
//! Concurrent row tables with key-scoped atomicity. The physical
//! storage engine is intentionally out of scope; these tables give the
//! services the two primitives the contract actually needs -
//! insert-or-ignore on a unique key, and owner-scoped mutation - and
//! nothing resembling an unchecked write path. All inserts flow
//! through the services, which stamp ownership from the verified
//! identity.

pub mod content;
pub mod interactions;
pub mod saved;

pub use content::{ContentRow, ContentStore};
pub use interactions::{InteractionRow, InteractionStore};
pub use saved::{SavedMark, SavedStore};
