use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use super::{ensure_non_empty, non_empty, App};
use crate::entities::{company, referral};
use crate::error::AppError;
use crate::model::ReferralInput;

impl App {
    pub async fn add_company(
        &self,
        name: String,
        website: Option<String>,
    ) -> Result<company::Model, AppError> {
        ensure_non_empty("company name", &name)?;
        let owner = self.owner()?;
        let now = Utc::now();
        let active = company::ActiveModel {
            owner_id: Set(owner.to_string()),
            name: Set(name.trim().to_string()),
            website: Set(non_empty(website)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let insert = company::Entity::insert(active).exec(&self.db).await?;
        let created = company::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("company not found after insert".to_string()))?;
        debug!(owner, company_id = created.id, "created company");
        Ok(created)
    }

    pub async fn list_companies(&self) -> Result<Vec<company::Model>, AppError> {
        let owner = self.owner()?;
        Ok(company::Entity::find()
            .filter(company::Column::OwnerId.eq(owner))
            .order_by_asc(company::Column::Name)
            .order_by_asc(company::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_company(&self, id: i64) -> Result<company::Model, AppError> {
        self.company_with_conn(&self.db, id).await
    }

    pub async fn add_referral(&self, input: ReferralInput) -> Result<referral::Model, AppError> {
        ensure_non_empty("referral name", &input.name)?;
        let owner = self.owner()?;
        if let Some(company_id) = input.company_id {
            self.company_with_conn(&self.db, company_id).await?;
        }
        let now = Utc::now();
        let active = referral::ActiveModel {
            owner_id: Set(owner.to_string()),
            company_id: Set(input.company_id),
            name: Set(input.name.trim().to_string()),
            completed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let insert = referral::Entity::insert(active).exec(&self.db).await?;
        let created = referral::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("referral not found after insert".to_string()))?;
        debug!(owner, referral_id = created.id, "created referral");
        Ok(created)
    }

    pub async fn complete_referral(&self, id: i64) -> Result<referral::Model, AppError> {
        let owner = self.owner()?;
        let current = referral::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .filter(|item| item.owner_id == owner)
            .ok_or_else(|| AppError::NotFound(format!("referral id {id}")))?;
        if current.completed {
            return Ok(current);
        }
        let mut active: referral::ActiveModel = current.into();
        active.completed = Set(true);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    pub async fn list_referrals(&self) -> Result<Vec<referral::Model>, AppError> {
        let owner = self.owner()?;
        Ok(referral::Entity::find()
            .filter(referral::Column::OwnerId.eq(owner))
            .order_by_asc(referral::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub(super) async fn company_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
    ) -> Result<company::Model, AppError> {
        let owner = self.owner()?;
        company::Entity::find_by_id(id)
            .one(db)
            .await?
            .filter(|item| item.owner_id == owner)
            .ok_or_else(|| AppError::NotFound(format!("company id {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{as_owner, setup_app};

    #[tokio::test]
    async fn referral_requires_owned_company() {
        let (_dir, app) = setup_app().await;
        let acme = app
            .add_company("Acme".to_string(), None)
            .await
            .expect("company");
        let other = as_owner(&app, "owner-2");
        let err = other
            .add_referral(ReferralInput {
                name: "Jane Doe".to_string(),
                company_id: Some(acme.id),
            })
            .await
            .expect_err("foreign company");
        assert!(matches!(err, AppError::NotFound(_)));

        let created = app
            .add_referral(ReferralInput {
                name: "Jane Doe".to_string(),
                company_id: Some(acme.id),
            })
            .await
            .expect("referral");
        assert!(!created.completed);
        let done = app.complete_referral(created.id).await.expect("complete");
        assert!(done.completed);
        assert_eq!(app.list_referrals().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn companies_are_listed_by_name() {
        let (_dir, app) = setup_app().await;
        app.add_company("Zeta".to_string(), None).await.expect("zeta");
        app.add_company("Acme".to_string(), Some(" ".to_string()))
            .await
            .expect("acme");
        let names: Vec<String> = app
            .list_companies()
            .await
            .expect("list")
            .into_iter()
            .map(|company| company.name)
            .collect();
        assert_eq!(names, vec!["Acme".to_string(), "Zeta".to_string()]);
        let err = app
            .add_company("  ".to_string(), None)
            .await
            .expect_err("empty");
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
