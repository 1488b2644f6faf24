#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    #[error("conflict: {0}")]
    Conflict(String),
}
