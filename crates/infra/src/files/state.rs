//! Upload session state machine.

use tracing::debug;
use uuid::Uuid;

/// Progress of one upload through the session protocol.
///
/// `NoSession → SessionOpen → PartsUploading → Completed`. A failure at any
/// step leaves the value where it was; nothing is rolled back and an open
/// session is left for the server to expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    NoSession,
    SessionOpen { session: Uuid },
    PartsUploading { session: Uuid, parts_done: u32 },
    Completed { file: Uuid },
}

impl UploadState {
    /// Session the upload is using, until it completes.
    pub fn session(&self) -> Option<Uuid> {
        match *self {
            Self::SessionOpen { session } | Self::PartsUploading { session, .. } => Some(session),
            Self::NoSession | Self::Completed { .. } => None,
        }
    }

    pub fn parts_done(&self) -> u32 {
        match *self {
            Self::PartsUploading { parts_done, .. } => parts_done,
            _ => 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub(crate) fn session_opened(&mut self, session: Uuid) {
        self.advance(Self::SessionOpen { session });
    }

    /// Record that part `number` (one-based) was accepted.
    pub(crate) fn part_uploaded(&mut self, number: u32) {
        debug_assert_eq!(number, self.parts_done() + 1, "parts are uploaded in order");
        if let Some(session) = self.session() {
            self.advance(Self::PartsUploading { session, parts_done: number });
        }
    }

    pub(crate) fn completed(&mut self, file: Uuid) {
        self.advance(Self::Completed { file });
    }

    fn advance(&mut self, next: Self) {
        let from = *self;
        debug!(?from, to = ?next, "upload state changed");
        *self = next;
    }
}
