use sea_orm::entity::prelude::*;

use super::status_column;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "study_problems")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_id: String,
    pub status_id: i64,
    pub day_of_week: i32,
    pub order_index: i32,
    pub title: String,
    pub link: Option<String>,
    pub difficulty: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Status,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Status => Entity::belongs_to(status_column::Entity)
                .from(Column::StatusId)
                .to(status_column::Column::Id)
                .into(),
        }
    }
}

impl Related<status_column::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Status.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
