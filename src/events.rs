//! Notifications for the outer UI.
//!
//! The canvas queues these as it changes state; the UI drains them to keep
//! its annotation list, status bar and progress indicators in sync.

use crate::jobs::JobKind;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A new annotation was committed.
    MaskAdded { name: String },
    /// An existing annotation now displays a different version.
    MaskUpdated { name: String },
    /// The current annotation changed.
    MaskSelected { name: String },
    /// An annotation was erased.
    MaskRemoved { name: String },

    ImageLoaded { width: u32, height: u32 },
    /// Everything was cleared.
    SessionClosed,

    // Background jobs
    JobStarted(JobKind),
    JobFinished(JobKind),
    JobFailed { kind: JobKind, message: String },
}

impl SessionEvent {
    /// Annotation name the event refers to, if any.
    pub fn mask_name(&self) -> Option<&str> {
        match self {
            SessionEvent::MaskAdded { name }
            | SessionEvent::MaskUpdated { name }
            | SessionEvent::MaskSelected { name }
            | SessionEvent::MaskRemoved { name } => Some(name),
            _ => None,
        }
    }
}
