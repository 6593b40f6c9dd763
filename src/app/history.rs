use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info};

use super::{finalize_transaction, App};
use crate::auth::{AdminAction, Authorizer};
use crate::entities::{application, status_column, status_history, study_problem};
use crate::error::AppError;
use crate::model::{ItemKind, OrderedMember};

#[derive(Clone, Debug, Serialize)]
pub struct BackfillReport {
    pub message: String,
    pub count: u64,
}

impl App {
    /// Records that an item of the owner sits in `status_id`. Returns false
    /// when the pair was already recorded.
    pub async fn record_transition(
        &self,
        kind: ItemKind,
        item_id: i64,
        status_id: i64,
    ) -> Result<bool, AppError> {
        let txn = self.db.begin().await?;
        let result: Result<bool, AppError> = async {
            let column = self
                .column_on_board_with_conn(&txn, status_id, kind.board())
                .await?;
            match kind {
                ItemKind::Application => {
                    let item = self.application_with_conn(&txn, item_id).await?;
                    record_entry_with_conn(
                        &txn,
                        item.owner_id(),
                        kind,
                        item_id,
                        status_id,
                        &column.name,
                    )
                    .await
                }
                ItemKind::StudyProblem => {
                    let item = self.study_problem_with_conn(&txn, item_id).await?;
                    record_entry_with_conn(
                        &txn,
                        item.owner_id(),
                        kind,
                        item_id,
                        status_id,
                        &column.name,
                    )
                    .await
                }
            }
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn history_for(
        &self,
        kind: ItemKind,
        item_id: i64,
    ) -> Result<Vec<status_history::Model>, AppError> {
        let owner = self.owner()?;
        Ok(status_history::Entity::find()
            .filter(status_history::Column::OwnerId.eq(owner))
            .filter(status_history::Column::ItemKind.eq(kind.as_str()))
            .filter(status_history::Column::ItemId.eq(item_id))
            .order_by_asc(status_history::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// One-time backfill across every owner: each item gets an entry for its
    /// current status. Safe to re-run; only missing entries are created.
    pub async fn backfill_history<A: Authorizer + ?Sized>(
        &self,
        authorizer: &A,
        credential: Option<&str>,
    ) -> Result<BackfillReport, AppError> {
        authorizer.authorize(AdminAction::BackfillHistory, credential)?;

        let txn = self.db.begin().await?;
        let result: Result<u64, AppError> = async {
            let names: HashMap<i64, String> = status_column::Entity::find()
                .all(&txn)
                .await?
                .into_iter()
                .map(|column| (column.id, column.name))
                .collect();

            let mut created = 0u64;
            let applications = application::Entity::find()
                .order_by_asc(application::Column::Id)
                .all(&txn)
                .await?;
            for item in &applications {
                if let Some(name) = names.get(&item.status_id) {
                    if record_member_with_conn(&txn, item, name).await? {
                        created += 1;
                    }
                }
            }
            let problems = study_problem::Entity::find()
                .order_by_asc(study_problem::Column::Id)
                .all(&txn)
                .await?;
            for item in &problems {
                if let Some(name) = names.get(&item.status_id) {
                    if record_member_with_conn(&txn, item, name).await? {
                        created += 1;
                    }
                }
            }
            Ok(created)
        }
        .await;

        let count = finalize_transaction(txn, result).await?;
        info!(count, "backfilled status history");
        Ok(BackfillReport {
            message: format!("Backfilled {count} status history entries."),
            count,
        })
    }
}

pub(super) async fn record_member_with_conn<C, M>(
    db: &C,
    member: &M,
    status_name: &str,
) -> Result<bool, AppError>
where
    C: ConnectionTrait,
    M: OrderedMember,
{
    record_entry_with_conn(
        db,
        member.owner_id(),
        M::KIND,
        member.item_id(),
        member.status_id(),
        status_name,
    )
    .await
}

async fn record_entry_with_conn<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    kind: ItemKind,
    item_id: i64,
    status_id: i64,
    status_name: &str,
) -> Result<bool, AppError> {
    let existing = status_history::Entity::find()
        .filter(status_history::Column::ItemKind.eq(kind.as_str()))
        .filter(status_history::Column::ItemId.eq(item_id))
        .filter(status_history::Column::StatusId.eq(status_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    let active = status_history::ActiveModel {
        owner_id: Set(owner.to_string()),
        item_kind: Set(kind.as_str().to_string()),
        item_id: Set(item_id),
        status_id: Set(status_id),
        status_name: Set(status_name.to_lowercase()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    status_history::Entity::insert(active).exec(db).await?;
    debug!(owner, item_kind = kind.as_str(), item_id, status_id, "recorded status transition");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::app::test_support::{as_global, as_owner, setup_app};
    use crate::auth::TokenAuthorizer;
    use crate::model::{ApplicationInput, Board, StudyProblemInput};

    async fn history_rows(app: &App) -> u64 {
        status_history::Entity::find()
            .count(&app.db)
            .await
            .expect("count history")
    }

    #[tokio::test]
    async fn record_transition_is_idempotent() {
        let (_dir, app) = setup_app().await;
        let columns = app
            .seed_default_columns(Board::Applications)
            .await
            .expect("seed");
        let created = app
            .create_application(
                columns[0].id,
                ApplicationInput {
                    role: "Engineer".to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("create");
        assert_eq!(history_rows(&app).await, 1);

        let inserted = app
            .record_transition(ItemKind::Application, created.id, columns[0].id)
            .await
            .expect("record");
        assert!(!inserted);
        let inserted = app
            .record_transition(ItemKind::Application, created.id, columns[2].id)
            .await
            .expect("record");
        assert!(inserted);
        assert_eq!(history_rows(&app).await, 2);
    }

    #[tokio::test]
    async fn backfill_requires_authorization() {
        let (_dir, app) = setup_app().await;
        let global = as_global(&app);
        let err = global
            .backfill_history(&TokenAuthorizer::new(None), Some("anything"))
            .await
            .expect_err("no secret");
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = global
            .backfill_history(&TokenAuthorizer::new(Some("s".to_string())), Some("x"))
            .await
            .expect_err("wrong token");
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn backfill_fills_missing_entries_once() {
        let (_dir, app) = setup_app().await;
        let columns = app
            .seed_default_columns(Board::Applications)
            .await
            .expect("seed");
        let study = as_owner(&app, "owner-2");
        let study_columns = study.seed_default_columns(Board::Study).await.expect("seed");
        app.create_application(
            columns[0].id,
            ApplicationInput {
                role: "Engineer".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("create");
        study
            .create_study_problem(
                study_columns[0].id,
                1,
                StudyProblemInput {
                    title: "Two sum".to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("create problem");

        // Simulate data written before history existed.
        status_history::Entity::delete_many()
            .exec(&app.db)
            .await
            .expect("clear history");

        let auth = TokenAuthorizer::new(Some("secret".to_string()));
        let global = as_global(&app);
        let first = global
            .backfill_history(&auth, Some("secret"))
            .await
            .expect("backfill");
        assert_eq!(first.count, 2);
        let rows = history_rows(&app).await;

        let second = global
            .backfill_history(&auth, Some("secret"))
            .await
            .expect("backfill again");
        assert_eq!(second.count, 0);
        assert_eq!(history_rows(&app).await, rows);

        let entries = study
            .history_for(ItemKind::StudyProblem, 1)
            .await
            .expect("history");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status_name, "to do");
    }
}
