use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

use super::history::record_member_with_conn;
use super::{ensure_non_empty, finalize_transaction, join_ids, non_empty, unique_ids, App};
use crate::entities::{application, status_column, study_problem};
use crate::error::AppError;
use crate::model::{
    ensure_day_of_week, ApplicationInput, Board, OrderedMember, StudyProblemInput, StudyQuery,
    STARTER_STUDY_PROBLEMS,
};

impl App {
    pub async fn create_application(
        &self,
        status_id: i64,
        input: ApplicationInput,
    ) -> Result<application::Model, AppError> {
        ensure_non_empty("application role", &input.role)?;
        let owner = self.owner()?;

        let txn = self.db.begin().await?;
        let result: Result<application::Model, AppError> = async {
            let column = self
                .column_on_board_with_conn(&txn, status_id, Board::Applications)
                .await?;
            if let Some(company_id) = input.company_id {
                self.company_with_conn(&txn, company_id).await?;
            }

            let now = Utc::now();
            let active = application::ActiveModel {
                owner_id: Set(owner.to_string()),
                status_id: Set(status_id),
                company_id: Set(input.company_id),
                company_name: Set(non_empty(input.company_name)),
                role: Set(input.role.trim().to_string()),
                notes: Set(non_empty(input.notes)),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            let insert = application::Entity::insert(active).exec(&txn).await?;
            let created = application::Entity::find_by_id(insert.last_insert_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound("application not found after insert".to_string())
                })?;
            record_member_with_conn(&txn, &created, &column.name).await?;
            Ok(created)
        }
        .await;

        let created = finalize_transaction(txn, result).await?;
        debug!(owner, application_id = created.id, status_id, "created application");
        Ok(created)
    }

    /// Inserts at the top of its `(status, day)` scope; existing problems in
    /// the scope move down by one.
    pub async fn create_study_problem(
        &self,
        status_id: i64,
        day_of_week: i32,
        input: StudyProblemInput,
    ) -> Result<study_problem::Model, AppError> {
        ensure_non_empty("study problem title", &input.title)?;
        let day_of_week = ensure_day_of_week(day_of_week)?;
        let owner = self.owner()?;

        let txn = self.db.begin().await?;
        let result: Result<study_problem::Model, AppError> = async {
            let column = self
                .column_on_board_with_conn(&txn, status_id, Board::Study)
                .await?;
            self.insert_study_problem_with_conn(&txn, &column, day_of_week, input, Utc::now())
                .await
        }
        .await;

        let created = finalize_transaction(txn, result).await?;
        debug!(
            owner,
            study_problem_id = created.id,
            status_id,
            day_of_week,
            "created study problem"
        );
        Ok(created)
    }

    /// Gives an owner with no study problems a starter week in the first
    /// study column, seeding the study columns first when there are none.
    /// Returns the problems created (empty on a re-run).
    pub async fn seed_default_templates(&self) -> Result<Vec<study_problem::Model>, AppError> {
        let owner = self.owner()?;
        let txn = self.db.begin().await?;
        let result: Result<Vec<study_problem::Model>, AppError> = async {
            let existing = study_problem::Entity::find()
                .filter(study_problem::Column::OwnerId.eq(owner))
                .count(&txn)
                .await?;
            if existing > 0 {
                return Ok(Vec::new());
            }
            let now = Utc::now();
            self.seed_columns_with_conn(&txn, Board::Study, now).await?;
            let column = self
                .list_columns_with_conn(&txn, Board::Study)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| AppError::NotFound("study column for templates".to_string()))?;

            let mut created = Vec::with_capacity(STARTER_STUDY_PROBLEMS.len());
            for (day, title, difficulty) in STARTER_STUDY_PROBLEMS {
                let input = StudyProblemInput {
                    title: title.to_string(),
                    link: None,
                    difficulty: Some(difficulty.to_string()),
                };
                created.push(
                    self.insert_study_problem_with_conn(&txn, &column, *day, input, now)
                        .await?,
                );
            }
            Ok(created)
        }
        .await;

        let created = finalize_transaction(txn, result).await?;
        if !created.is_empty() {
            info!(owner, count = created.len(), "seeded study templates");
        }
        Ok(created)
    }

    async fn insert_study_problem_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        column: &status_column::Model,
        day_of_week: i32,
        input: StudyProblemInput,
        now: DateTime<Utc>,
    ) -> Result<study_problem::Model, AppError> {
        let owner = self.owner()?;
        shift_scope_with_conn(db, owner, column.id, day_of_week, 0, 1, now).await?;

        let active = study_problem::ActiveModel {
            owner_id: Set(owner.to_string()),
            status_id: Set(column.id),
            day_of_week: Set(day_of_week),
            order_index: Set(0),
            title: Set(input.title.trim().to_string()),
            link: Set(non_empty(input.link)),
            difficulty: Set(non_empty(input.difficulty)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let insert = study_problem::Entity::insert(active).exec(db).await?;
        let created = study_problem::Entity::find_by_id(insert.last_insert_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("study problem not found after insert".to_string()))?;
        record_member_with_conn(db, &created, &column.name).await?;
        Ok(created)
    }

    pub async fn get_application(&self, id: i64) -> Result<application::Model, AppError> {
        self.application_with_conn(&self.db, id).await
    }

    pub async fn get_study_problem(&self, id: i64) -> Result<study_problem::Model, AppError> {
        self.study_problem_with_conn(&self.db, id).await
    }

    /// Applications in creation order.
    pub async fn list_applications(
        &self,
        status_id: Option<i64>,
    ) -> Result<Vec<application::Model>, AppError> {
        let owner = self.owner()?;
        let mut select =
            application::Entity::find().filter(application::Column::OwnerId.eq(owner));
        if let Some(status_id) = status_id {
            select = select.filter(application::Column::StatusId.eq(status_id));
        }
        Ok(select
            .order_by_asc(application::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn list_study_problems(
        &self,
        query: &StudyQuery,
    ) -> Result<Vec<study_problem::Model>, AppError> {
        let owner = self.owner()?;
        let mut select =
            study_problem::Entity::find().filter(study_problem::Column::OwnerId.eq(owner));
        if let Some(status_id) = query.status_id {
            select = select.filter(study_problem::Column::StatusId.eq(status_id));
        }
        if let Some(day) = query.day_of_week {
            select = select.filter(study_problem::Column::DayOfWeek.eq(day));
        }
        Ok(select
            .order_by_asc(study_problem::Column::StatusId)
            .order_by_asc(study_problem::Column::DayOfWeek)
            .order_by_asc(study_problem::Column::OrderIndex)
            .order_by_asc(study_problem::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn transfer_application(
        &self,
        id: i64,
        new_status_id: i64,
    ) -> Result<application::Model, AppError> {
        let txn = self.db.begin().await?;
        let result: Result<application::Model, AppError> = async {
            let current = self.application_with_conn(&txn, id).await?;
            let column = self
                .column_on_board_with_conn(&txn, new_status_id, Board::Applications)
                .await?;
            if current.status_id == new_status_id {
                return Ok(current);
            }
            let mut active: application::ActiveModel = current.into();
            active.status_id = Set(new_status_id);
            active.updated_at = Set(Utc::now());
            let updated = active.update(&txn).await?;
            record_member_with_conn(&txn, &updated, &column.name).await?;
            Ok(updated)
        }
        .await;

        let updated = finalize_transaction(txn, result).await?;
        debug!(
            owner = %updated.owner_id,
            application_id = id,
            status_id = new_status_id,
            "transferred application"
        );
        Ok(updated)
    }

    /// Moves a problem to another status (and optionally day). The old scope
    /// closes its gap and the problem lands on top of the new scope.
    pub async fn transfer_study_problem(
        &self,
        id: i64,
        new_status_id: i64,
        new_day: Option<i32>,
    ) -> Result<study_problem::Model, AppError> {
        let owner = self.owner()?;
        let txn = self.db.begin().await?;
        let result: Result<study_problem::Model, AppError> = async {
            let current = self.study_problem_with_conn(&txn, id).await?;
            let day = match new_day {
                Some(day) => ensure_day_of_week(day)?,
                None => current.day_of_week,
            };
            let column = self
                .column_on_board_with_conn(&txn, new_status_id, Board::Study)
                .await?;
            if (current.status_id(), current.bucket()) == (new_status_id, Some(day)) {
                return Ok(current);
            }

            let now = Utc::now();
            shift_scope_with_conn(
                &txn,
                owner,
                current.status_id,
                current.day_of_week,
                current.order_index + 1,
                -1,
                now,
            )
            .await?;
            shift_scope_with_conn(&txn, owner, new_status_id, day, 0, 1, now).await?;

            let status_changed = current.status_id != new_status_id;
            let mut active: study_problem::ActiveModel = current.into();
            active.status_id = Set(new_status_id);
            active.day_of_week = Set(day);
            active.order_index = Set(0);
            active.updated_at = Set(now);
            let updated = active.update(&txn).await?;
            if status_changed {
                record_member_with_conn(&txn, &updated, &column.name).await?;
            }
            Ok(updated)
        }
        .await;

        let updated = finalize_transaction(txn, result).await?;
        debug!(
            owner,
            study_problem_id = id,
            status_id = new_status_id,
            day_of_week = updated.day_of_week,
            "transferred study problem"
        );
        Ok(updated)
    }

    /// Assigns `order_indices[i]` to `ids[i]`. The batch must cover exactly
    /// one `(status, day)` scope and the indices must be a permutation of
    /// `0..ids.len()`. Returns the scope in its new order.
    pub async fn reorder_study_problems(
        &self,
        ids: &[i64],
        order_indices: &[i32],
    ) -> Result<Vec<study_problem::Model>, AppError> {
        if ids.len() != order_indices.len() {
            return Err(AppError::InvalidOperation(format!(
                "reorder needs one index per id (got {} ids and {} indices)",
                ids.len(),
                order_indices.len()
            )));
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if unique_ids(ids).len() != ids.len() {
            return Err(AppError::InvalidOperation(
                "reorder ids must be unique".to_string(),
            ));
        }
        let mut sorted = order_indices.to_vec();
        sorted.sort_unstable();
        if sorted.iter().enumerate().any(|(idx, value)| *value != idx as i32) {
            return Err(AppError::InvalidOperation(format!(
                "reorder indices must be a permutation of 0..{}",
                ids.len()
            )));
        }

        let owner = self.owner()?;
        let txn = self.db.begin().await?;
        let result: Result<Vec<study_problem::Model>, AppError> = async {
            let problems = study_problem::Entity::find()
                .filter(study_problem::Column::OwnerId.eq(owner))
                .filter(study_problem::Column::Id.is_in(ids.to_vec()))
                .all(&txn)
                .await?;
            let existing: HashSet<i64> = problems.iter().map(|problem| problem.id).collect();
            let missing: Vec<i64> = ids
                .iter()
                .cloned()
                .filter(|id| !existing.contains(id))
                .collect();
            if !missing.is_empty() {
                return Err(AppError::NotFound(format!(
                    "study problem id(s) not found: {}",
                    join_ids(&missing)
                )));
            }

            let (status_id, day) = (problems[0].status_id, problems[0].day_of_week);
            if problems
                .iter()
                .any(|problem| problem.status_id != status_id || problem.day_of_week != day)
            {
                return Err(AppError::InvalidOperation(
                    "reorder ids must share one status and day".to_string(),
                ));
            }
            let scope_size = scope_select(owner, status_id, day).count(&txn).await?;
            if scope_size != ids.len() as u64 {
                return Err(AppError::InvalidOperation(format!(
                    "reorder must include every problem in the scope ({scope_size}), got {}",
                    ids.len()
                )));
            }

            let now = Utc::now();
            for (id, order_index) in ids.iter().zip(order_indices) {
                let active = study_problem::ActiveModel {
                    id: Set(*id),
                    order_index: Set(*order_index),
                    updated_at: Set(now),
                    ..Default::default()
                };
                active.update(&txn).await?;
            }

            Ok(scope_select(owner, status_id, day)
                .order_by_asc(study_problem::Column::OrderIndex)
                .order_by_asc(study_problem::Column::Id)
                .all(&txn)
                .await?)
        }
        .await;

        let reordered = finalize_transaction(txn, result).await?;
        debug!(owner, count = reordered.len(), "reordered study problems");
        Ok(reordered)
    }

    pub async fn delete_application(&self, id: i64) -> Result<(), AppError> {
        let owner = self.owner()?;
        let result = application::Entity::delete_many()
            .filter(application::Column::OwnerId.eq(owner))
            .filter(application::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("application id {id}")));
        }
        debug!(owner, application_id = id, "deleted application");
        Ok(())
    }

    /// Removes a problem and closes the gap it leaves in its scope.
    pub async fn delete_study_problem(&self, id: i64) -> Result<(), AppError> {
        let owner = self.owner()?;
        let txn = self.db.begin().await?;
        let result: Result<(), AppError> = async {
            let current = self.study_problem_with_conn(&txn, id).await?;
            study_problem::Entity::delete_by_id(id).exec(&txn).await?;
            shift_scope_with_conn(
                &txn,
                owner,
                current.status_id,
                current.day_of_week,
                current.order_index + 1,
                -1,
                Utc::now(),
            )
            .await
        }
        .await;

        finalize_transaction(txn, result).await?;
        debug!(owner, study_problem_id = id, "deleted study problem");
        Ok(())
    }

    /// Item count per status column on `board`, from one scan of the owner's items.
    pub async fn count_by_status(&self, board: Board) -> Result<BTreeMap<i64, u64>, AppError> {
        let owner = self.owner()?;
        let status_ids: Vec<i64> = match board {
            Board::Applications => application::Entity::find()
                .filter(application::Column::OwnerId.eq(owner))
                .all(&self.db)
                .await?
                .iter()
                .map(OrderedMember::status_id)
                .collect(),
            Board::Study => study_problem::Entity::find()
                .filter(study_problem::Column::OwnerId.eq(owner))
                .all(&self.db)
                .await?
                .iter()
                .map(OrderedMember::status_id)
                .collect(),
        };

        let mut counts = BTreeMap::new();
        for status_id in status_ids {
            *counts.entry(status_id).or_insert(0u64) += 1;
        }
        Ok(counts)
    }

    pub(super) async fn application_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
    ) -> Result<application::Model, AppError> {
        let owner = self.owner()?;
        application::Entity::find_by_id(id)
            .one(db)
            .await?
            .filter(|item| item.owner_id == owner)
            .ok_or_else(|| AppError::NotFound(format!("application id {id}")))
    }

    pub(super) async fn study_problem_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
    ) -> Result<study_problem::Model, AppError> {
        let owner = self.owner()?;
        study_problem::Entity::find_by_id(id)
            .one(db)
            .await?
            .filter(|item| item.owner_id == owner)
            .ok_or_else(|| AppError::NotFound(format!("study problem id {id}")))
    }
}

fn scope_select(owner: &str, status_id: i64, day: i32) -> sea_orm::Select<study_problem::Entity> {
    study_problem::Entity::find()
        .filter(study_problem::Column::OwnerId.eq(owner))
        .filter(study_problem::Column::StatusId.eq(status_id))
        .filter(study_problem::Column::DayOfWeek.eq(day))
}

/// Adds `delta` to `order_index` of every problem in the scope at or after `from`.
async fn shift_scope_with_conn<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    status_id: i64,
    day: i32,
    from: i32,
    delta: i32,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    study_problem::Entity::update_many()
        .col_expr(
            study_problem::Column::OrderIndex,
            Expr::col(study_problem::Column::OrderIndex).add(delta),
        )
        .col_expr(study_problem::Column::UpdatedAt, Expr::value(now))
        .filter(study_problem::Column::OwnerId.eq(owner))
        .filter(study_problem::Column::StatusId.eq(status_id))
        .filter(study_problem::Column::DayOfWeek.eq(day))
        .filter(study_problem::Column::OrderIndex.gte(from))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{as_owner, setup_app};
    use crate::entities::status_column;
    use crate::model::{ColumnInput, ItemKind, DEFAULT_COLUMN_COLOR};

    async fn study_column(app: &App, name: &str) -> status_column::Model {
        app.create_column(ColumnInput {
            board: Board::Study,
            name: name.to_string(),
            color: DEFAULT_COLUMN_COLOR.to_string(),
            is_default: false,
        })
        .await
        .expect("create column")
    }

    async fn add_problem(app: &App, status_id: i64, day: i32, title: &str) -> study_problem::Model {
        app.create_study_problem(
            status_id,
            day,
            StudyProblemInput {
                title: title.to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("create problem")
    }

    async fn scope(app: &App, status_id: i64, day: i32) -> Vec<(String, i32)> {
        app.list_study_problems(&StudyQuery {
            status_id: Some(status_id),
            day_of_week: Some(day),
        })
        .await
        .expect("list problems")
        .into_iter()
        .map(|problem| (problem.title, problem.order_index))
        .collect()
    }

    fn named(pairs: &[(&str, i32)]) -> Vec<(String, i32)> {
        pairs
            .iter()
            .map(|(name, order)| (name.to_string(), *order))
            .collect()
    }

    #[tokio::test]
    async fn seed_default_templates_is_idempotent() {
        let (_dir, app) = setup_app().await;
        let created = app.seed_default_templates().await.expect("seed templates");
        assert_eq!(created.len(), STARTER_STUDY_PROBLEMS.len());
        let columns = app.list_columns(Board::Study).await.expect("columns");
        assert_eq!(columns.len(), Board::Study.default_columns().len());
        assert!(created
            .iter()
            .all(|problem| problem.status_id == columns[0].id && problem.order_index == 0));
        let history = app
            .history_for(ItemKind::StudyProblem, created[0].id)
            .await
            .expect("history");
        assert_eq!(history.len(), 1);

        let rerun = app.seed_default_templates().await.expect("seed again");
        assert!(rerun.is_empty());
        let all = app
            .list_study_problems(&StudyQuery::default())
            .await
            .expect("list problems");
        assert_eq!(all.len(), STARTER_STUDY_PROBLEMS.len());
    }

    #[tokio::test]
    async fn seed_default_templates_skips_owner_with_problems() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        add_problem(&app, todo.id, 2, "Mine").await;
        assert!(app
            .seed_default_templates()
            .await
            .expect("seed templates")
            .is_empty());
        assert_eq!(app.list_columns(Board::Study).await.expect("columns").len(), 1);

        let other = as_owner(&app, "owner-2");
        let custom = study_column(&other, "Backlog").await;
        let created = other.seed_default_templates().await.expect("seed templates");
        assert!(created.iter().all(|problem| problem.status_id == custom.id));
        assert_eq!(other.list_columns(Board::Study).await.expect("columns").len(), 1);
    }

    #[tokio::test]
    async fn create_study_problem_inserts_on_top() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        add_problem(&app, todo.id, 1, "First").await;
        add_problem(&app, todo.id, 1, "Second").await;
        let newest = add_problem(&app, todo.id, 1, "Third").await;
        assert_eq!(newest.order_index, 0);
        assert_eq!(
            scope(&app, todo.id, 1).await,
            named(&[("Third", 0), ("Second", 1), ("First", 2)])
        );
    }

    #[tokio::test]
    async fn create_study_problem_leaves_other_days_alone() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        add_problem(&app, todo.id, 1, "Monday").await;
        add_problem(&app, todo.id, 2, "Tuesday").await;
        assert_eq!(scope(&app, todo.id, 1).await, named(&[("Monday", 0)]));
        assert_eq!(scope(&app, todo.id, 2).await, named(&[("Tuesday", 0)]));
    }

    #[tokio::test]
    async fn create_study_problem_validates_day_and_board() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        let err = app
            .create_study_problem(
                todo.id,
                7,
                StudyProblemInput {
                    title: "Bad day".to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect_err("bad day");
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = app
            .create_application(
                todo.id,
                ApplicationInput {
                    role: "Engineer".to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect_err("wrong board");
        assert!(matches!(err, AppError::InvalidOperation(_)));

        let err = app
            .create_study_problem(
                999,
                1,
                StudyProblemInput {
                    title: "Nowhere".to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect_err("missing column");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn transfer_study_problem_renumbers_both_scopes() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        let done = study_column(&app, "Done").await;
        add_problem(&app, todo.id, 3, "A").await;
        let b = add_problem(&app, todo.id, 3, "B").await;
        add_problem(&app, todo.id, 3, "C").await;
        add_problem(&app, done.id, 3, "X").await;

        let moved = app
            .transfer_study_problem(b.id, done.id, None)
            .await
            .expect("transfer");
        assert_eq!(moved.order_index, 0);
        assert_eq!(moved.day_of_week, 3);
        assert_eq!(scope(&app, todo.id, 3).await, named(&[("C", 0), ("A", 1)]));
        assert_eq!(scope(&app, done.id, 3).await, named(&[("B", 0), ("X", 1)]));

        let history = app
            .history_for(ItemKind::StudyProblem, b.id)
            .await
            .expect("history");
        let names: Vec<&str> = history.iter().map(|entry| entry.status_name.as_str()).collect();
        assert_eq!(names, vec!["todo", "done"]);
    }

    #[tokio::test]
    async fn transfer_study_problem_to_other_day_keeps_status() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        let a = add_problem(&app, todo.id, 0, "A").await;
        add_problem(&app, todo.id, 0, "B").await;
        add_problem(&app, todo.id, 5, "Z").await;

        app.transfer_study_problem(a.id, todo.id, Some(5))
            .await
            .expect("transfer day");
        assert_eq!(scope(&app, todo.id, 0).await, named(&[("B", 0)]));
        assert_eq!(scope(&app, todo.id, 5).await, named(&[("A", 0), ("Z", 1)]));
        let history = app
            .history_for(ItemKind::StudyProblem, a.id)
            .await
            .expect("history");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn transfer_into_same_scope_is_noop() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        let a = add_problem(&app, todo.id, 2, "A").await;
        add_problem(&app, todo.id, 2, "B").await;
        let unchanged = app
            .transfer_study_problem(a.id, todo.id, Some(2))
            .await
            .expect("noop");
        assert_eq!(unchanged.order_index, 1);
        assert_eq!(scope(&app, todo.id, 2).await, named(&[("B", 0), ("A", 1)]));
    }

    #[tokio::test]
    async fn transfer_missing_items_is_not_found() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        let err = app
            .transfer_study_problem(42, todo.id, None)
            .await
            .expect_err("missing problem");
        assert!(matches!(err, AppError::NotFound(_)));
        let err = app
            .transfer_application(42, todo.id)
            .await
            .expect_err("missing application");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn transfer_application_updates_status_and_history() {
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
                    company_name: Some("Acme".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("create");
        let moved = app
            .transfer_application(created.id, columns[1].id)
            .await
            .expect("transfer");
        assert_eq!(moved.status_id, columns[1].id);
        let history = app
            .history_for(ItemKind::Application, created.id)
            .await
            .expect("history");
        let names: Vec<&str> = history.iter().map(|entry| entry.status_name.as_str()).collect();
        assert_eq!(names, vec!["applied", "interview"]);
    }

    #[tokio::test]
    async fn reorder_applies_permutation() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        let a = add_problem(&app, todo.id, 4, "A").await;
        let b = add_problem(&app, todo.id, 4, "B").await;
        let c = add_problem(&app, todo.id, 4, "C").await;

        let reordered = app
            .reorder_study_problems(&[a.id, b.id, c.id], &[0, 1, 2])
            .await
            .expect("reorder");
        let titles: Vec<&str> = reordered.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn reorder_rejects_inconsistent_batches() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        let a = add_problem(&app, todo.id, 4, "A").await;
        let b = add_problem(&app, todo.id, 4, "B").await;
        let other_day = add_problem(&app, todo.id, 5, "Z").await;

        let err = app
            .reorder_study_problems(&[a.id, b.id], &[0])
            .await
            .expect_err("length mismatch");
        assert!(matches!(err, AppError::InvalidOperation(_)));

        let err = app
            .reorder_study_problems(&[a.id, b.id], &[0, 0])
            .await
            .expect_err("not a permutation");
        assert!(matches!(err, AppError::InvalidOperation(_)));

        let err = app
            .reorder_study_problems(&[a.id, other_day.id], &[1, 0])
            .await
            .expect_err("mixed scopes");
        assert!(matches!(err, AppError::InvalidOperation(_)));

        let err = app
            .reorder_study_problems(&[a.id], &[0])
            .await
            .expect_err("partial scope");
        assert!(matches!(err, AppError::InvalidOperation(_)));

        let err = app
            .reorder_study_problems(&[a.id, 999], &[1, 0])
            .await
            .expect_err("missing id");
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(scope(&app, todo.id, 4).await, named(&[("B", 0), ("A", 1)]));
    }

    #[tokio::test]
    async fn delete_study_problem_closes_gap() {
        let (_dir, app) = setup_app().await;
        let todo = study_column(&app, "Todo").await;
        add_problem(&app, todo.id, 6, "A").await;
        let b = add_problem(&app, todo.id, 6, "B").await;
        add_problem(&app, todo.id, 6, "C").await;

        app.delete_study_problem(b.id).await.expect("delete");
        assert_eq!(scope(&app, todo.id, 6).await, named(&[("C", 0), ("A", 1)]));
        let err = app.delete_study_problem(b.id).await.expect_err("gone");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn count_by_status_groups_owner_items() {
        let (_dir, app) = setup_app().await;
        let columns = app
            .seed_default_columns(Board::Applications)
            .await
            .expect("seed");
        for (column, role) in [(0, "A"), (0, "B"), (2, "C")] {
            app.create_application(
                columns[column].id,
                ApplicationInput {
                    role: role.to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("create");
        }
        let other = as_owner(&app, "owner-2");
        let other_columns = other
            .seed_default_columns(Board::Applications)
            .await
            .expect("seed other");
        other
            .create_application(
                other_columns[0].id,
                ApplicationInput {
                    role: "Elsewhere".to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("create other");

        let counts = app
            .count_by_status(Board::Applications)
            .await
            .expect("count");
        let expected: BTreeMap<i64, u64> =
            [(columns[0].id, 2), (columns[2].id, 1)].into_iter().collect();
        assert_eq!(counts, expected);
    }

    #[tokio::test]
    async fn delete_application_is_owner_scoped() {
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
        let other = as_owner(&app, "owner-2");
        let err = other
            .delete_application(created.id)
            .await
            .expect_err("foreign");
        assert!(matches!(err, AppError::NotFound(_)));
        app.delete_application(created.id).await.expect("delete");
        assert!(app.list_applications(None).await.expect("list").is_empty());
    }
}
