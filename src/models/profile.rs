use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teloxide::types::ChatId;

use super::{Activity, Diet, Gender, Goal};

/// Fields written on upsert. Audit timestamps belong to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub height: i32,
    pub weight: i32,
    pub age: i32,
    pub gender: Gender,
    pub diet: Diet,
    pub activity: Activity,
    pub goal: Goal,
    pub bmi: f64,
    pub calories: i64,
    pub meals: Vec<String>,
}

/// A persisted nutrition profile, one per chat id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub chat_id: ChatId,
    pub name: String,
    pub height: i32,
    pub weight: i32,
    pub age: i32,
    pub gender: Gender,
    pub diet: Diet,
    pub activity: Activity,
    pub goal: Goal,
    pub bmi: f64,
    pub calories: i64,
    pub meals: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
