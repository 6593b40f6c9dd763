mod activity;
mod columns;
mod history;
mod items;
mod records;

use std::collections::HashSet;

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait};

use crate::entities::status_column;
use crate::error::AppError;
use crate::model::Board;

pub use activity::{ActivityEvent, LeaderboardEntry, UNKNOWN_COMPANY};
pub use history::BackfillReport;

/// Engine handle. Owner-scoped operations only read and write rows of
/// `owner_id`; a global handle can only run the cross-owner scans.
pub struct App {
    db: DatabaseConnection,
    owner_id: Option<String>,
}

impl App {
    pub fn new(db: DatabaseConnection, owner_id: String) -> Self {
        Self {
            db,
            owner_id: Some(owner_id),
        }
    }

    pub fn global(db: DatabaseConnection) -> Self {
        Self { db, owner_id: None }
    }

    fn owner(&self) -> Result<&str, AppError> {
        self.owner_id
            .as_deref()
            .ok_or_else(|| AppError::InvalidInput("owner id is required".to_string()))
    }

    async fn column_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
    ) -> Result<status_column::Model, AppError> {
        let owner = self.owner()?;
        status_column::Entity::find_by_id(id)
            .one(db)
            .await?
            .filter(|column| column.owner_id == owner)
            .ok_or_else(|| AppError::NotFound(format!("status column id {id}")))
    }

    /// Like `column_with_conn`, but also requires the column to sit on `board`.
    async fn column_on_board_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
        board: Board,
    ) -> Result<status_column::Model, AppError> {
        let column = self.column_with_conn(db, id).await?;
        if column.board != board.as_str() {
            return Err(AppError::InvalidOperation(format!(
                "status column id {id} belongs to the {} board, not {}",
                column.board,
                board.as_str()
            )));
        }
        Ok(column)
    }
}

async fn finalize_transaction<T>(
    txn: DatabaseTransaction,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                return Err(rollback_err.into());
            }
            Err(err)
        }
    }
}

fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for id in ids {
        if seen.insert(*id) {
            unique.push(*id);
        }
    }
    unique
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn ensure_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{label} cannot be empty")));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
