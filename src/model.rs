use serde::{Deserialize, Serialize};

use crate::entities::{application, study_problem};
use crate::error::AppError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Board {
    Applications,
    Study,
}

impl Board {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applications => "applications",
            Self::Study => "study",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "applications" => Ok(Self::Applications),
            "study" => Ok(Self::Study),
            other => Err(AppError::InvalidInput(format!("unknown board: {other}"))),
        }
    }

    /// Columns seeded once per owner and board, in display order.
    pub fn default_columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Applications => &[
                ("Applied", "#3b82f6"),
                ("Interview", "#f59e0b"),
                ("Offer", "#22c55e"),
                ("Rejected", "#ef4444"),
            ],
            Self::Study => &[
                ("To Do", "#64748b"),
                ("In Progress", "#f59e0b"),
                ("Done", "#22c55e"),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Application,
    StudyProblem,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::StudyProblem => "study",
        }
    }

    pub fn board(&self) -> Board {
        match self {
            Self::Application => Board::Applications,
            Self::StudyProblem => Board::Study,
        }
    }
}

/// Placement shared by every item that lives in a status column.
pub trait OrderedMember {
    const KIND: ItemKind;

    fn item_id(&self) -> i64;
    fn owner_id(&self) -> &str;
    fn status_id(&self) -> i64;

    /// Secondary bucket inside the column, if the item kind has one.
    fn bucket(&self) -> Option<i32> {
        None
    }
}

impl OrderedMember for application::Model {
    const KIND: ItemKind = ItemKind::Application;

    fn item_id(&self) -> i64 {
        self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn status_id(&self) -> i64 {
        self.status_id
    }
}

impl OrderedMember for study_problem::Model {
    const KIND: ItemKind = ItemKind::StudyProblem;

    fn item_id(&self) -> i64 {
        self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn status_id(&self) -> i64 {
        self.status_id
    }

    fn bucket(&self) -> Option<i32> {
        Some(self.day_of_week)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnInput {
    pub board: Board,
    pub name: String,
    pub color: String,
    pub is_default: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ColumnChanges {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApplicationInput {
    pub role: String,
    pub company_id: Option<i64>,
    pub company_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StudyProblemInput {
    pub title: String,
    pub link: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReferralInput {
    pub name: String,
    pub company_id: Option<i64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StudyQuery {
    pub status_id: Option<i64>,
    pub day_of_week: Option<i32>,
}

pub const DEFAULT_ACTIVITY_LIMIT: usize = 10;
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const DEFAULT_COLUMN_COLOR: &str = "#64748b";

/// Starter week for a fresh study board: `(day_of_week, title, difficulty)`.
pub const STARTER_STUDY_PROBLEMS: &[(i32, &str, &str)] = &[
    (1, "Two Sum", "Easy"),
    (2, "Valid Parentheses", "Easy"),
    (3, "Merge Intervals", "Medium"),
    (4, "LRU Cache", "Medium"),
    (5, "Word Ladder", "Hard"),
];

pub fn ensure_day_of_week(day: i32) -> Result<i32, AppError> {
    if !(0..=6).contains(&day) {
        return Err(AppError::InvalidInput(format!(
            "day of week must be between 0 (Sunday) and 6 (Saturday), got {day}"
        )));
    }
    Ok(day)
}
