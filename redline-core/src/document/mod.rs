//! Document Model providers
//!
//! The engine never parses document containers itself. It talks to a
//! provider through the [`DocumentModel`] trait, which exposes exactly what
//! rule application needs:
//!
//! ```text
//! read paragraphs (style, assembled text, runs, list label)
//!     ↓
//! [Rule Engine]
//!     ↓
//! scoped mutations (text edits, partial formatting)
//! ```
//!
//! ## Available Providers
//!
//! - `InMemoryDocument` - owned paragraphs/runs, persisted as JSON or YAML
//!   snapshots (used by the CLI and the tests)
//! - Word-processor automation bridges live outside this crate and
//!   implement the same trait

pub mod memory;
pub mod provider;

// Re-export main types
pub use memory::InMemoryDocument;
pub use provider::{validate_edits, DocumentModel, ParagraphSnapshot};
