// src/session/uploader.rs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

use super::{SaveHandler, SessionError, SessionState, UploadSession};
use crate::decode::{decode_async, UploadFile};

/// Shared handle to one upload session.
///
/// Callers outside the form (a commit button, a CLI) hold a clone and call
/// it directly; `subscribe` reports whether commit is currently allowed.
#[derive(Clone)]
pub struct Uploader {
    session: Arc<Mutex<UploadSession>>,
    commit_enabled: Arc<watch::Sender<bool>>,
}

impl Uploader {
    pub fn new(session: UploadSession) -> Self {
        let (tx, _rx) = watch::channel(session.commit_enabled());
        Self {
            session: Arc::new(Mutex::new(session)),
            commit_enabled: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.commit_enabled.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, UploadSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &UploadSession) {
        let enabled = session.commit_enabled();
        let previous = self.commit_enabled.send_replace(enabled);
        if previous != enabled {
            debug!(enabled, "commit availability changed");
        }
    }

    /// Decode `file` on the blocking pool and load it into the session.
    ///
    /// Files over the session's size limit fail without being parsed. A later
    /// `upload` or `clear` supersedes this one; its result is then discarded.
    pub async fn upload(&self, file: UploadFile) -> SessionState {
        let (ticket, limit) = {
            let mut session = self.lock();
            let ticket = session.begin_upload(&file.name);
            self.publish(&session);
            (ticket, session.options().max_upload_bytes)
        };

        let result = match file.ensure_within(limit) {
            Ok(()) => decode_async(file).await,
            Err(e) => Err(e),
        };

        let mut session = self.lock();
        session.complete_upload(ticket, result);
        self.publish(&session);
        session.state()
    }

    pub fn commit(&self, handler: &mut dyn SaveHandler) -> Result<usize, SessionError> {
        let mut session = self.lock();
        let result = session.commit(handler);
        self.publish(&session);
        result
    }

    /// Run `f` against the session, then republish commit availability.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut UploadSession) -> R) -> R {
        let mut session = self.lock();
        let out = f(&mut session);
        self.publish(&session);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::schema::Entity;
    use crate::decode::DecodeError;
    use crate::session::{LogSink, SessionOptions};

    fn uploader() -> Uploader {
        init_test_logging();
        Uploader::new(UploadSession::new(
            Entity::RateTables.builtin_schema().clone(),
            SessionOptions::default(),
        ))
    }

    fn rate_file(body: &str) -> UploadFile {
        UploadFile::new(
            "rates.csv",
            format!("Name,Schedule,Start Date\n{}", body).into_bytes(),
        )
    }

    #[tokio::test]
    async fn upload_edit_and_commit_through_handle() {
        let uploader = uploader();
        let enabled = uploader.subscribe();
        assert!(!*enabled.borrow());

        let state = uploader
            .upload(rate_file(
                "Gold,Data Migration Plan,\nSilver,Data Migration Plan,2025-02-01\n",
            ))
            .await;
        assert_eq!(state, SessionState::Decoded);
        assert!(!*enabled.borrow());

        uploader.with_session(|s| s.delete_row(0)).unwrap();
        assert!(*enabled.borrow());

        assert_eq!(uploader.commit(&mut LogSink), Ok(1));
        assert!(!*enabled.borrow());
        assert_eq!(uploader.with_session(|s| s.state()), SessionState::Committed);
    }

    #[tokio::test]
    async fn concurrent_uploads_keep_the_latest() {
        let uploader = uploader();
        let first = uploader.lock().begin_upload("first.csv");

        let state = uploader
            .upload(rate_file("Gold,Data Migration Plan,2025-01-01\n"))
            .await;
        assert_eq!(state, SessionState::Decoded);

        let applied =
            uploader.with_session(|s| s.complete_upload(first, Err(DecodeError::EmptyFile)));
        assert!(!applied);
        assert_eq!(
            uploader.with_session(|s| s.file_name().map(String::from)),
            Some("rates.csv".into())
        );
    }

    #[tokio::test]
    async fn unsupported_file_fails_the_upload() {
        let uploader = uploader();
        let state = uploader
            .upload(UploadFile::new("rates.pdf", b"%PDF".to_vec()))
            .await;
        assert_eq!(state, SessionState::DecodeFailed);
        assert!(uploader.with_session(|s| s.decode_error().is_some()));
    }

    #[tokio::test]
    async fn oversized_upload_fails_without_decoding() {
        init_test_logging();
        let options = SessionOptions {
            max_upload_bytes: 16,
            ..SessionOptions::default()
        };
        let uploader = Uploader::new(UploadSession::new(
            Entity::RateTables.builtin_schema().clone(),
            options,
        ));

        let state = uploader
            .upload(rate_file("Gold,Data Migration Plan,2025-01-01\n"))
            .await;
        assert_eq!(state, SessionState::DecodeFailed);
        let error = uploader.with_session(|s| s.decode_error().cloned());
        assert!(matches!(error, Some(DecodeError::TooLarge { limit: 16, .. })));
        assert!(uploader.with_session(|s| s.rows().is_empty()));
        assert!(!*uploader.subscribe().borrow());
    }
}
