use async_trait::async_trait;
use grocer_types::ports::guest_cart_store::GuestCartStore;
use grocer_types::ports::RepoError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[cfg(feature = "memory")]
pub use memory::InMemoryGuestStore;

/// One JSON file per guest session under `dir`.
#[derive(Debug, Clone)]
pub struct FileGuestStore {
    dir: PathBuf,
}

impl FileGuestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, session: Uuid) -> PathBuf {
        self.dir.join(format!("cart-{session}.json"))
    }
}

#[async_trait]
impl GuestCartStore for FileGuestStore {
    async fn read(&self, session: Uuid) -> Result<Option<String>, RepoError> {
        match tokio::fs::read_to_string(self.path(session)).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RepoError::DbError(e.to_string())),
        }
    }

    async fn write(&self, session: Uuid, payload: String) -> Result<(), RepoError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| RepoError::DbError(e.to_string()))?;
        // Write-then-rename: readers only ever see a whole payload.
        let tmp = self.dir.join(format!("cart-{session}.json.tmp"));
        tokio::fs::write(&tmp, payload)
            .await
            .map_err(|e| RepoError::DbError(e.to_string()))?;
        tokio::fs::rename(&tmp, self.path(session))
            .await
            .map_err(|e| RepoError::DbError(e.to_string()))
    }

    async fn remove(&self, session: Uuid) -> Result<(), RepoError> {
        match tokio::fs::remove_file(self.path(session)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepoError::DbError(e.to_string())),
        }
    }
}

#[cfg(feature = "memory")]
mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct InMemoryGuestStore {
        pub payloads: Arc<DashMap<Uuid, String>>,
    }

    impl InMemoryGuestStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl GuestCartStore for InMemoryGuestStore {
        async fn read(&self, session: Uuid) -> Result<Option<String>, RepoError> {
            Ok(self.payloads.get(&session).map(|r| r.clone()))
        }

        async fn write(&self, session: Uuid, payload: String) -> Result<(), RepoError> {
            self.payloads.insert(session, payload);
            Ok(())
        }

        async fn remove(&self, session: Uuid) -> Result<(), RepoError> {
            self.payloads.remove(&session);
            Ok(())
        }
    }
}
