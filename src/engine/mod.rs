//! Annotation engine.
//!
//! This module handles:
//! - Reconstructing the call stack from instruction fetches
//! - Matching accesses against the watch list
//! - Rendering banners and inline comments
//! - Driving a single streaming pass over the trace

pub mod access_watcher;
pub mod annotation;
pub mod annotator;
pub mod call_stack;
pub mod summary;

// Re-export main types
pub use access_watcher::AccessWatcher;
pub use annotation::{
    AccessAnnotation, AccessDirection, Annotation, Banner, BannerKind, InlineComment,
};
pub use annotator::Annotator;
pub use call_stack::{CallFrame, CallStackTracker, CallTransition, Observation};
pub use summary::{AnnotationSummary, AnomalyRecord, RunReport};
