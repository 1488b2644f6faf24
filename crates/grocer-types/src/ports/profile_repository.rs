use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::profile::Profile;
use crate::ports::RepoError;

#[async_trait]
pub trait ProfileRepository: Send + Sync + 'static {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError>;

    /// Inserts the profile, replacing any existing row with the same id.
    async fn upsert_profile(&self, profile: Profile) -> Result<Profile, RepoError>;
}
