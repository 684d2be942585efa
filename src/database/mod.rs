use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use teloxide::types::ChatId;
use thiserror::Error;

use crate::models::{Activity, Diet, Gender, Goal, NewProfile, Profile};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence boundary for completed profiles, keyed by chat id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert-or-replace. Atomic from the caller's point of view.
    async fn upsert(&self, chat_id: ChatId, profile: NewProfile) -> Result<Profile, StoreError>;

    async fn find(&self, chat_id: ChatId) -> Result<Option<Profile>, StoreError>;

    /// Idempotent; deleting an absent profile is not an error.
    async fn delete(&self, chat_id: ChatId) -> Result<(), StoreError>;
}

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                chat_id BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                height INTEGER NOT NULL,
                weight INTEGER NOT NULL,
                age INTEGER NOT NULL,
                gender TEXT NOT NULL,
                diet TEXT NOT NULL,
                activity TEXT NOT NULL,
                goal TEXT NOT NULL,
                bmi DOUBLE PRECISION NOT NULL,
                calories BIGINT NOT NULL,
                meals JSONB NOT NULL DEFAULT '[]',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn profile_from_row(row: &PgRow) -> Result<Profile, StoreError> {
    let gender: String = row.try_get("gender")?;
    let diet: String = row.try_get("diet")?;
    let activity: String = row.try_get("activity")?;
    let goal: String = row.try_get("goal")?;
    let meals: serde_json::Value = row.try_get("meals")?;

    Ok(Profile {
        chat_id: ChatId(row.try_get("chat_id")?),
        name: row.try_get("name")?,
        height: row.try_get("height")?,
        weight: row.try_get("weight")?,
        age: row.try_get("age")?,
        gender: Gender::from_stored(&gender),
        diet: Diet::from_stored(&diet),
        activity: Activity::from_stored(&activity),
        goal: Goal::from_stored(&goal),
        bmi: row.try_get("bmi")?,
        calories: row.try_get("calories")?,
        meals: serde_json::from_value(meals)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ProfileStore for Database {
    async fn upsert(&self, chat_id: ChatId, profile: NewProfile) -> Result<Profile, StoreError> {
        let meals = serde_json::to_value(&profile.meals)?;

        let row = sqlx::query(
            r#"
            INSERT INTO profiles
            (chat_id, name, height, weight, age, gender, diet, activity, goal, bmi, calories, meals)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (chat_id)
            DO UPDATE SET
                name = EXCLUDED.name,
                height = EXCLUDED.height,
                weight = EXCLUDED.weight,
                age = EXCLUDED.age,
                gender = EXCLUDED.gender,
                diet = EXCLUDED.diet,
                activity = EXCLUDED.activity,
                goal = EXCLUDED.goal,
                bmi = EXCLUDED.bmi,
                calories = EXCLUDED.calories,
                meals = EXCLUDED.meals,
                updated_at = NOW()
            RETURNING chat_id, name, height, weight, age, gender, diet, activity, goal,
                      bmi, calories, meals, created_at, updated_at
            "#,
        )
        .bind(chat_id.0)
        .bind(&profile.name)
        .bind(profile.height)
        .bind(profile.weight)
        .bind(profile.age)
        .bind(profile.gender.label())
        .bind(profile.diet.label())
        .bind(profile.activity.label())
        .bind(profile.goal.stored())
        .bind(profile.bmi)
        .bind(profile.calories)
        .bind(meals)
        .fetch_one(&self.pool)
        .await?;

        profile_from_row(&row)
    }

    async fn find(&self, chat_id: ChatId) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query(
            "SELECT chat_id, name, height, weight, age, gender, diet, activity, goal,
                    bmi, calories, meals, created_at, updated_at
             FROM profiles WHERE chat_id = $1",
        )
        .bind(chat_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn delete(&self, chat_id: ChatId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM profiles WHERE chat_id = $1")
            .bind(chat_id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
