use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

pub mod entities;
pub mod models;
pub mod seed;
pub mod types;

/// Handle to the embedded store. Cheap to clone; migrations run on open so a
/// handle always points at a current schema.
#[derive(Clone)]
pub struct DBService {
    pub conn: DatabaseConnection,
}

impl DBService {
    /// Opens (and creates, `mode=rwc`) a file-backed database, e.g.
    /// `sqlite://tasks.sqlite?mode=rwc`.
    pub async fn new(database_url: &str) -> Result<DBService, DbErr> {
        let conn = Database::connect(database_url).await?;
        db_migration::Migrator::up(&conn, None).await?;
        Ok(DBService { conn })
    }

    pub async fn new_in_memory() -> Result<DBService, DbErr> {
        Self::new("sqlite::memory:").await
    }
}
