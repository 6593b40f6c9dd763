use sea_orm::entity::prelude::*;

use super::{application, study_problem};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "status_columns")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_id: String,
    pub board: String,
    pub name: String,
    pub color: String,
    pub sort_order: i32,
    pub is_default: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Application,
    StudyProblem,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Application => Entity::has_many(application::Entity).into(),
            Self::StudyProblem => Entity::has_many(study_problem::Entity).into(),
        }
    }
}

impl Related<application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Application.def()
    }
}

impl Related<study_problem::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudyProblem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
