use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, EntityTrait, Schema, Statement,
};
use url::Url;

use crate::entities::{application, company, referral, status_column, status_history, study_problem};
use crate::error::AppError;

pub fn resolve_db_path(home: &Path) -> PathBuf {
    home.join("huntboard.db")
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Exclusive lock file guarding the database. Every command holds the write
/// side for its whole run, which makes structural mutations single-writer.
pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::InvalidInput(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await?;

    create_table(db, company::Entity).await?;
    create_table(db, status_column::Entity).await?;
    create_table(db, application::Entity).await?;
    create_table(db, study_problem::Entity).await?;
    create_table(db, referral::Entity).await?;
    create_table(db, status_history::Entity).await?;

    create_index(
        db,
        Index::create()
            .name("idx_status_columns_owner_board_order")
            .table(status_column::Entity)
            .col(status_column::Column::OwnerId)
            .col(status_column::Column::Board)
            .col(status_column::Column::SortOrder)
            .to_owned(),
    )
    .await?;

    create_index(
        db,
        Index::create()
            .name("idx_applications_owner_status")
            .table(application::Entity)
            .col(application::Column::OwnerId)
            .col(application::Column::StatusId)
            .to_owned(),
    )
    .await?;

    create_index(
        db,
        Index::create()
            .name("idx_study_problems_scope_order")
            .table(study_problem::Entity)
            .col(study_problem::Column::OwnerId)
            .col(study_problem::Column::StatusId)
            .col(study_problem::Column::DayOfWeek)
            .col(study_problem::Column::OrderIndex)
            .to_owned(),
    )
    .await?;

    create_index(
        db,
        Index::create()
            .name("idx_referrals_owner")
            .table(referral::Entity)
            .col(referral::Column::OwnerId)
            .to_owned(),
    )
    .await?;

    create_index(
        db,
        Index::create()
            .name("idx_companies_owner")
            .table(company::Entity)
            .col(company::Column::OwnerId)
            .to_owned(),
    )
    .await?;

    create_index(
        db,
        Index::create()
            .name("idx_status_history_item_status")
            .table(status_history::Entity)
            .col(status_history::Column::ItemKind)
            .col(status_history::Column::ItemId)
            .col(status_history::Column::StatusId)
            .unique()
            .to_owned(),
    )
    .await?;

    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), AppError> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(builder.build(&stmt)).await?;
    Ok(())
}

async fn create_index(
    db: &DatabaseConnection,
    mut stmt: IndexCreateStatement,
) -> Result<(), AppError> {
    let builder = db.get_database_backend();
    stmt.if_not_exists();
    db.execute(builder.build(&stmt)).await?;
    Ok(())
}
