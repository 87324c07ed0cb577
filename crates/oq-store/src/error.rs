use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("no active profile is set")]
    NoActiveProfile,

    #[error("query record not found: {0}")]
    QueryNotFound(String),

    #[error("corrupt row in {table}: {detail}")]
    CorruptRow { table: &'static str, detail: String },
}
