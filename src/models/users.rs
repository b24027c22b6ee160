use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub points: i64,
    pub total_submissions: i64,
    pub verified_submissions: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What other users may see of a user.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub points: i64,
    pub total_submissions: i64,
    pub verified_submissions: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            name: user.name,
            points: user.points,
            total_submissions: user.total_submissions,
            verified_submissions: user.verified_submissions,
            created_at: user.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum UserDetails {
    Own(User),
    Public(PublicUser),
}

/// Profile data handed over by the identity provider on sign-in.
#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub id: String,
    pub name: String,
    pub points: i64,
    pub total_submissions: i64,
    pub verified_submissions: i64,
}

impl LeaderboardEntry {
    pub fn ranked(users: Vec<User>) -> Vec<Self> {
        users
            .into_iter()
            .enumerate()
            .map(|(index, user)| LeaderboardEntry {
                rank: index + 1,
                id: user.id,
                name: user.name,
                points: user.points,
                total_submissions: user.total_submissions,
                verified_submissions: user.verified_submissions,
            })
            .collect()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub backend: &'static str,
    pub users: i64,
    pub submissions: i64,
}
