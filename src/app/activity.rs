use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use super::App;
use crate::entities::{application, company, referral, status_column};
use crate::error::AppError;
use crate::identity::IdentityDirectory;
use crate::util::relative_time;

pub const UNKNOWN_COMPANY: &str = "Unknown Company";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Application,
    Referral,
}

#[derive(Clone, Debug, Serialize)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub item_id: i64,
    pub action: String,
    pub company: String,
    pub created_at: DateTime<Utc>,
    pub relative_time: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub display_name: String,
    pub score: u64,
}

impl App {
    pub async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEvent>, AppError> {
        self.recent_activity_at(limit, Utc::now()).await
    }

    /// Merged application/referral feed, newest first, labelled relative to `now`.
    pub async fn recent_activity_at(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActivityEvent>, AppError> {
        let owner = self.owner()?;
        let applications = application::Entity::find()
            .filter(application::Column::OwnerId.eq(owner))
            .order_by_asc(application::Column::Id)
            .all(&self.db)
            .await?;
        let referrals = referral::Entity::find()
            .filter(referral::Column::OwnerId.eq(owner))
            .order_by_asc(referral::Column::Id)
            .all(&self.db)
            .await?;

        let status_names: HashMap<i64, String> = status_column::Entity::find()
            .filter(status_column::Column::OwnerId.eq(owner))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|column| (column.id, column.name))
            .collect();

        let company_ids: BTreeSet<i64> = applications
            .iter()
            .filter_map(|item| item.company_id)
            .chain(referrals.iter().filter_map(|item| item.company_id))
            .collect();
        let mut company_names = HashMap::with_capacity(company_ids.len());
        for id in company_ids {
            if let Some(found) = company::Entity::find_by_id(id).one(&self.db).await? {
                if found.owner_id == owner {
                    company_names.insert(id, found.name);
                }
            }
        }

        let mut events = Vec::with_capacity(applications.len() + referrals.len());
        for item in &applications {
            let status = status_names.get(&item.status_id).map(String::as_str);
            let company = item
                .company_id
                .and_then(|id| company_names.get(&id).cloned())
                .or_else(|| item.company_name.clone())
                .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
            events.push(ActivityEvent {
                kind: ActivityKind::Application,
                item_id: item.id,
                action: application_action(status).to_string(),
                company,
                created_at: item.created_at,
                relative_time: relative_time(item.created_at, now),
            });
        }
        for item in &referrals {
            let company = item
                .company_id
                .and_then(|id| company_names.get(&id).cloned())
                .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
            events.push(ActivityEvent {
                kind: ActivityKind::Referral,
                item_id: item.id,
                action: referral_action(item.completed).to_string(),
                company,
                created_at: item.created_at,
                relative_time: relative_time(item.created_at, now),
            });
        }

        // Stable sort keeps scan order among equal timestamps.
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit);
        Ok(events)
    }

    /// Ranks every user by referral count across all owners.
    pub async fn leaderboard<D: IdentityDirectory + ?Sized>(
        &self,
        directory: &D,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let referrals = referral::Entity::find()
            .order_by_asc(referral::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rank_referrals(&referrals, directory, limit))
    }
}

pub fn application_action(status_name: Option<&str>) -> &'static str {
    match status_name {
        Some(name) if name.to_lowercase().contains("interview") => "Interview with",
        Some("Offer") => "Received offer from",
        Some("Rejected") => "Rejected by",
        _ => "Applied to",
    }
}

pub fn referral_action(completed: bool) -> &'static str {
    if completed {
        "Successfully referred at"
    } else {
        "Referred"
    }
}

fn rank_referrals<D: IdentityDirectory + ?Sized>(
    referrals: &[referral::Model],
    directory: &D,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    // (user, count, first referral name) in first-seen order.
    let mut tallies: Vec<(String, u64, String)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for item in referrals {
        match positions.get(item.owner_id.as_str()) {
            Some(&idx) => tallies[idx].1 += 1,
            None => {
                positions.insert(item.owner_id.as_str(), tallies.len());
                tallies.push((item.owner_id.clone(), 1, item.name.clone()));
            }
        }
    }

    tallies.sort_by(|a, b| b.1.cmp(&a.1));
    tallies.truncate(limit);

    let user_ids: Vec<String> = tallies.iter().map(|(user, _, _)| user.clone()).collect();
    let mut names = directory.display_names(&user_ids);
    tallies
        .into_iter()
        .map(|(user_id, score, referral_name)| {
            let display_name = names
                .remove(&user_id)
                .or_else(|| referral_name.split_whitespace().next().map(str::to_string))
                .unwrap_or_else(|| user_id.clone());
            LeaderboardEntry {
                user_id,
                display_name,
                score,
            }
        })
        .collect()
}
