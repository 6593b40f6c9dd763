use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

use super::{ensure_non_empty, finalize_transaction, App};
use crate::entities::{application, status_column, study_problem};
use crate::error::AppError;
use crate::model::{Board, ColumnChanges, ColumnInput};

impl App {
    pub async fn list_columns(&self, board: Board) -> Result<Vec<status_column::Model>, AppError> {
        self.list_columns_with_conn(&self.db, board).await
    }

    pub async fn get_column(&self, id: i64) -> Result<status_column::Model, AppError> {
        self.column_with_conn(&self.db, id).await
    }

    /// Appends a column after the owner's last one on the board.
    pub async fn create_column(&self, input: ColumnInput) -> Result<status_column::Model, AppError> {
        ensure_non_empty("column name", &input.name)?;
        ensure_non_empty("column color", &input.color)?;
        let owner = self.owner()?;

        let txn = self.db.begin().await?;
        let result = insert_column_with_conn(
            &txn,
            owner,
            input.board,
            input.name.trim(),
            input.color.trim(),
            input.is_default,
            Utc::now(),
        )
        .await;
        let created = finalize_transaction(txn, result).await?;
        debug!(
            owner,
            column_id = created.id,
            board = %created.board,
            sort_order = created.sort_order,
            "created status column"
        );
        Ok(created)
    }

    /// Creates the board's default columns unless the owner already has any
    /// column there. Returns the columns created (empty on a re-run).
    pub async fn seed_default_columns(
        &self,
        board: Board,
    ) -> Result<Vec<status_column::Model>, AppError> {
        let owner = self.owner()?;
        let txn = self.db.begin().await?;
        let result = self.seed_columns_with_conn(&txn, board, Utc::now()).await;

        let created = finalize_transaction(txn, result).await?;
        if !created.is_empty() {
            info!(owner, board = board.as_str(), count = created.len(), "seeded default columns");
        }
        Ok(created)
    }

    pub async fn update_column(
        &self,
        id: i64,
        changes: ColumnChanges,
    ) -> Result<status_column::Model, AppError> {
        if let Some(name) = changes.name.as_deref() {
            ensure_non_empty("column name", name)?;
        }
        if let Some(color) = changes.color.as_deref() {
            ensure_non_empty("column color", color)?;
        }

        let column = self.column_with_conn(&self.db, id).await?;
        let renamed = changes
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| *name != column.name)
            .map(str::to_string);
        if column.is_default && renamed.is_some() {
            return Err(AppError::InvalidOperation(format!(
                "cannot rename default column '{}' (id {id})",
                column.name
            )));
        }

        let mut active: status_column::ActiveModel = column.into();
        if let Some(name) = renamed {
            active.name = Set(name);
        }
        if let Some(color) = changes.color {
            active.color = Set(color.trim().to_string());
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;
        debug!(owner = %updated.owner_id, column_id = id, "updated status column");
        Ok(updated)
    }

    /// Deletes a column together with every item placed in it, then closes
    /// the gap in the board's ordering. Returns the number of items removed.
    pub async fn delete_column(&self, id: i64) -> Result<u64, AppError> {
        let owner = self.owner()?;
        let txn = self.db.begin().await?;
        let result: Result<u64, AppError> = async {
            let column = self.column_with_conn(&txn, id).await?;
            if column.is_default {
                return Err(AppError::InvalidOperation(format!(
                    "cannot delete default column '{}' (id {id})",
                    column.name
                )));
            }
            let board = Board::parse(&column.board)?;
            let removed = match board {
                Board::Applications => {
                    application::Entity::delete_many()
                        .filter(application::Column::OwnerId.eq(owner))
                        .filter(application::Column::StatusId.eq(id))
                        .exec(&txn)
                        .await?
                        .rows_affected
                }
                Board::Study => {
                    study_problem::Entity::delete_many()
                        .filter(study_problem::Column::OwnerId.eq(owner))
                        .filter(study_problem::Column::StatusId.eq(id))
                        .exec(&txn)
                        .await?
                        .rows_affected
                }
            };
            status_column::Entity::delete_by_id(id).exec(&txn).await?;
            self.normalize_columns_with_conn(&txn, board).await?;
            Ok(removed)
        }
        .await;

        let removed = finalize_transaction(txn, result).await?;
        info!(owner, column_id = id, removed_items = removed, "deleted status column");
        Ok(removed)
    }

    /// Moves a column to `new_order`, clamped into the board's range. Only the
    /// columns between the old and new position shift by one.
    pub async fn move_column(
        &self,
        id: i64,
        new_order: i64,
    ) -> Result<Vec<status_column::Model>, AppError> {
        let owner = self.owner()?;
        let txn = self.db.begin().await?;
        let result: Result<Vec<status_column::Model>, AppError> = async {
            let column = self.column_with_conn(&txn, id).await?;
            let board = Board::parse(&column.board)?;
            let total = columns_on_board(owner, board).count(&txn).await? as i64;
            let target = new_order.clamp(0, total - 1) as i32;
            let current = column.sort_order;
            if target == current {
                return self.list_columns_with_conn(&txn, board).await;
            }

            let now = Utc::now();
            let shift = status_column::Entity::update_many()
                .col_expr(status_column::Column::UpdatedAt, Expr::value(now))
                .filter(status_column::Column::OwnerId.eq(owner))
                .filter(status_column::Column::Board.eq(board.as_str()));
            if current < target {
                shift
                    .col_expr(
                        status_column::Column::SortOrder,
                        Expr::col(status_column::Column::SortOrder).sub(1),
                    )
                    .filter(status_column::Column::SortOrder.gt(current))
                    .filter(status_column::Column::SortOrder.lte(target))
                    .exec(&txn)
                    .await?;
            } else {
                shift
                    .col_expr(
                        status_column::Column::SortOrder,
                        Expr::col(status_column::Column::SortOrder).add(1),
                    )
                    .filter(status_column::Column::SortOrder.gte(target))
                    .filter(status_column::Column::SortOrder.lt(current))
                    .exec(&txn)
                    .await?;
            }

            let mut active: status_column::ActiveModel = column.into();
            active.sort_order = Set(target);
            active.updated_at = Set(now);
            active.update(&txn).await?;
            debug!(owner, column_id = id, from = current, to = target, "moved status column");
            self.list_columns_with_conn(&txn, board).await
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub(super) async fn seed_columns_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        board: Board,
        now: DateTime<Utc>,
    ) -> Result<Vec<status_column::Model>, AppError> {
        let owner = self.owner()?;
        if columns_on_board(owner, board).count(db).await? > 0 {
            return Ok(Vec::new());
        }
        let mut created = Vec::with_capacity(board.default_columns().len());
        for (name, color) in board.default_columns() {
            created.push(insert_column_with_conn(db, owner, board, name, color, true, now).await?);
        }
        Ok(created)
    }

    pub(super) async fn list_columns_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        board: Board,
    ) -> Result<Vec<status_column::Model>, AppError> {
        let owner = self.owner()?;
        Ok(columns_on_board(owner, board)
            .order_by_asc(status_column::Column::SortOrder)
            .order_by_asc(status_column::Column::Id)
            .all(db)
            .await?)
    }

    /// Rewrites `sort_order` to `0..n-1`, keeping the current relative order.
    async fn normalize_columns_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        board: Board,
    ) -> Result<(), AppError> {
        let columns = self.list_columns_with_conn(db, board).await?;
        let now = Utc::now();
        for (idx, column) in columns.into_iter().enumerate() {
            let desired_order = idx as i32;
            if column.sort_order != desired_order {
                let mut active: status_column::ActiveModel = column.into();
                active.sort_order = Set(desired_order);
                active.updated_at = Set(now);
                active.update(db).await?;
            }
        }
        Ok(())
    }
}

fn columns_on_board(owner: &str, board: Board) -> sea_orm::Select<status_column::Entity> {
    status_column::Entity::find()
        .filter(status_column::Column::OwnerId.eq(owner))
        .filter(status_column::Column::Board.eq(board.as_str()))
}

async fn insert_column_with_conn<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    board: Board,
    name: &str,
    color: &str,
    is_default: bool,
    now: DateTime<Utc>,
) -> Result<status_column::Model, AppError> {
    let last = columns_on_board(owner, board)
        .order_by_desc(status_column::Column::SortOrder)
        .one(db)
        .await?;
    let sort_order = last.map(|column| column.sort_order + 1).unwrap_or(0);

    let active = status_column::ActiveModel {
        owner_id: Set(owner.to_string()),
        board: Set(board.as_str().to_string()),
        name: Set(name.to_string()),
        color: Set(color.to_string()),
        sort_order: Set(sort_order),
        is_default: Set(is_default),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let insert = status_column::Entity::insert(active).exec(db).await?;
    status_column::Entity::find_by_id(insert.last_insert_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("status column not found after insert".to_string()))
}
