mod store;

pub use store::{Clock, SessionStore, SystemClock, SESSION_TIMEOUT_SECS};

use std::sync::Arc;

use teloxide::types::ChatId;

use crate::database::ProfileStore;
use crate::handlers::utils::{escape_code_entity, escape_markdown_v2};
use crate::models::{
    Activity, Choice, CompletedAnswers, DialogState, Diet, Gender, Goal, NewProfile, Profile,
    Session,
};
use crate::plan::{self, BmiStatus, Plan};

/// Inbound event, already stripped of transport details.
#[derive(Debug, Clone)]
pub enum Event {
    Begin,
    Reset,
    Text(String),
    Choice(Choice),
}

/// Outbound effect. The transport layer renders `Choices` as an inline
/// keyboard with one button per option.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Choices { text: String, options: Vec<Choice> },
}

/// Drives one user at a time through the questionnaire. Validation failures
/// and persistence errors never escape: they are logged and turned into
/// user-facing notices.
#[derive(Clone)]
pub struct DialogEngine {
    sessions: Arc<SessionStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl DialogEngine {
    pub fn new(sessions: Arc<SessionStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        DialogEngine { sessions, profiles }
    }

    pub async fn handle(&self, chat_id: ChatId, event: Event) -> Vec<Reply> {
        match event {
            Event::Begin => self.handle_begin(chat_id).await,
            Event::Reset => self.handle_reset(chat_id).await,
            Event::Text(text) => self.handle_text(chat_id, &text).await,
            Event::Choice(choice) => self.handle_choice(chat_id, choice).await,
        }
    }

    async fn handle_begin(&self, chat_id: ChatId) -> Vec<Reply> {
        let cell = self.sessions.get_or_create(chat_id).await;
        let mut session = cell.lock().await;
        if self.sessions.is_expired(&session) {
            *session = Session::fresh(self.sessions.now());
        }
        self.sessions.touch(&mut session);

        match self.profiles.find(chat_id).await {
            Ok(Some(profile)) => {
                // The stored plan is replayed as-is; only the label is
                // derived again from the stored BMI.
                let status = BmiStatus::classify(profile.bmi);
                vec![Reply::Text(plan_summary("Your Saved Info", &profile, status))]
            }
            Ok(None) => {
                let mut replies =
                    vec![Reply::Text("👋 Welcome to FitPlanner Bot\\!".to_string())];
                replies.extend(prompt_for(session.state));
                replies
            }
            Err(e) => {
                log::error!("Profile lookup failed for user {}: {}", chat_id, e);
                vec![Reply::Text(
                    "⚠️ Sorry, something went wrong\\. Please try again later\\.".to_string(),
                )]
            }
        }
    }

    async fn handle_reset(&self, chat_id: ChatId) -> Vec<Reply> {
        let mut replies = Vec::new();
        let deleted = match self.profiles.delete(chat_id).await {
            Ok(()) => {
                replies.push(Reply::Text(
                    "🗑️ Your data has been reset\\. Let's start over\\.".to_string(),
                ));
                true
            }
            Err(e) => {
                log::error!("Profile delete failed for user {}: {}", chat_id, e);
                replies.push(Reply::Text(
                    "⚠️ Unable to reset your data\\. Please try again\\.".to_string(),
                ));
                false
            }
        };

        // The local dialog restarts whether or not the remote delete worked.
        let cell = self.sessions.get_or_create(chat_id).await;
        let mut session = cell.lock().await;
        *session = Session::fresh(self.sessions.now());

        if deleted {
            replies.extend(prompt_for(DialogState::Name));
        }
        replies
    }

    async fn handle_text(&self, chat_id: ChatId, text: &str) -> Vec<Reply> {
        if text.starts_with('/') {
            return Vec::new();
        }

        let cell = self.sessions.get_or_create(chat_id).await;
        let mut session = cell.lock().await;
        if self.sessions.is_expired(&session) {
            *session = Session::fresh(self.sessions.now());
        }
        self.sessions.touch(&mut session);

        let input = text.trim();
        match session.state {
            DialogState::Name => {
                if input.is_empty() {
                    return prompt_for(DialogState::Name).into_iter().collect();
                }
                session.answers.name = Some(input.to_string());
                session.state = DialogState::Height;
                prompt_for(DialogState::Height).into_iter().collect()
            }
            DialogState::Height => match input.parse::<i32>() {
                Ok(height) => {
                    session.answers.height = Some(height);
                    session.state = DialogState::Weight;
                    prompt_for(DialogState::Weight).into_iter().collect()
                }
                Err(_) => vec![Reply::Text(
                    "❌ Please enter a valid number for height in cm\\.".to_string(),
                )],
            },
            DialogState::Weight => match input.parse::<i32>() {
                Ok(weight) => {
                    session.answers.weight = Some(weight);
                    session.state = DialogState::Age;
                    prompt_for(DialogState::Age).into_iter().collect()
                }
                Err(_) => vec![Reply::Text(
                    "❌ Please enter a valid number for weight in kg\\.".to_string(),
                )],
            },
            DialogState::Age => match input.parse::<i32>() {
                Ok(age) => {
                    session.answers.age = Some(age);
                    session.state = DialogState::Gender;
                    prompt_for(DialogState::Gender).into_iter().collect()
                }
                Err(_) => vec![Reply::Text(
                    "❌ Please enter a valid number for age\\.".to_string(),
                )],
            },
            // The remaining slots are button-driven; free text is ignored.
            DialogState::Gender
            | DialogState::Diet
            | DialogState::Activity
            | DialogState::Goal
            | DialogState::Complete => Vec::new(),
        }
    }

    async fn handle_choice(&self, chat_id: ChatId, choice: Choice) -> Vec<Reply> {
        let Some(cell) = self.sessions.get(chat_id).await else {
            log::debug!("Choice {:?} from user {} with no session", choice, chat_id);
            return Vec::new();
        };
        let mut session = cell.lock().await;
        self.sessions.touch(&mut session);

        match (session.state, choice) {
            (DialogState::Gender, Choice::Gender(gender)) => {
                session.answers.gender = Some(gender);
                session.state = DialogState::Diet;
                prompt_for(DialogState::Diet).into_iter().collect()
            }
            (DialogState::Diet, Choice::Diet(diet)) => {
                session.answers.diet = Some(diet);
                session.state = DialogState::Activity;
                prompt_for(DialogState::Activity).into_iter().collect()
            }
            (DialogState::Activity, Choice::Activity(activity)) => {
                session.answers.activity = Some(activity);
                session.state = DialogState::Goal;
                prompt_for(DialogState::Goal).into_iter().collect()
            }
            (DialogState::Goal, Choice::Goal(goal)) => {
                session.answers.goal = Some(goal);
                self.finish(chat_id, &mut session).await
            }
            (state, choice) => {
                log::debug!(
                    "Ignoring out-of-order choice {:?} from user {} in state {:?}",
                    choice,
                    chat_id,
                    state
                );
                Vec::new()
            }
        }
    }

    /// Terminal step: compute the plan, persist it, reply with the summary
    /// and drop the session. On persistence failure the answers are kept and
    /// the goal slot is re-opened so tapping the button again retries.
    async fn finish(&self, chat_id: ChatId, session: &mut Session) -> Vec<Reply> {
        let Some(answers) = session.answers.completed() else {
            // Unreachable through the state machine; recover by restarting.
            log::error!(
                "Dialog for user {} reached the goal slot with missing answers",
                chat_id
            );
            *session = Session::fresh(self.sessions.now());
            let mut replies = vec![Reply::Text(
                "⚠️ Something went wrong\\. Let's start over\\.".to_string(),
            )];
            replies.extend(prompt_for(DialogState::Name));
            return replies;
        };

        let Plan {
            bmi,
            calories,
            status,
            meals,
        } = plan::generate(&answers);
        let CompletedAnswers {
            name,
            height,
            weight,
            age,
            gender,
            diet,
            activity,
            goal,
        } = answers;
        let profile = NewProfile {
            name,
            height,
            weight,
            age,
            gender,
            diet,
            activity,
            goal,
            bmi,
            calories,
            meals,
        };

        match self.profiles.upsert(chat_id, profile).await {
            Ok(saved) => {
                session.state = DialogState::Complete;
                self.sessions.clear(chat_id).await;
                vec![Reply::Text(plan_summary("Your Provided Info", &saved, status))]
            }
            Err(e) => {
                log::error!("DB save error for user {}: {}", chat_id, e);
                session.answers.goal = None;
                session.state = DialogState::Goal;
                vec![Reply::Text(
                    "⚠️ Could not save your data\\. Please try again later\\.".to_string(),
                )]
            }
        }
    }
}

fn prompt_for(state: DialogState) -> Option<Reply> {
    let reply = match state {
        DialogState::Name => Reply::Text("🧑‍💼 What's your name?".to_string()),
        DialogState::Height => Reply::Text("📏 What is your height in cm?".to_string()),
        DialogState::Weight => Reply::Text("⚖️ What is your weight in kg?".to_string()),
        DialogState::Age => Reply::Text("🎂 What is your age?".to_string()),
        DialogState::Gender => Reply::Choices {
            text: "🚻 What's your gender?".to_string(),
            options: vec![Choice::Gender(Gender::Male), Choice::Gender(Gender::Female)],
        },
        DialogState::Diet => Reply::Choices {
            text: "🍽️ What's your diet preference?".to_string(),
            options: vec![
                Choice::Diet(Diet::Veg),
                Choice::Diet(Diet::NonVeg),
                Choice::Diet(Diet::Vegan),
            ],
        },
        DialogState::Activity => Reply::Choices {
            text: "💪 What's your activity level?".to_string(),
            options: vec![
                Choice::Activity(Activity::Sedentary),
                Choice::Activity(Activity::Light),
                Choice::Activity(Activity::Moderate),
                Choice::Activity(Activity::Heavy),
            ],
        },
        DialogState::Goal => Reply::Choices {
            text: "🎯 What's your goal?".to_string(),
            options: vec![
                Choice::Goal(Goal::Lose),
                Choice::Goal(Goal::Gain),
                Choice::Goal(Goal::Maintain),
            ],
        },
        DialogState::Complete => return None,
    };
    Some(reply)
}

/// MarkdownV2 summary shown on completion and on repeat /start.
fn plan_summary(heading: &str, profile: &Profile, status: BmiStatus) -> String {
    let meals = profile
        .meals
        .iter()
        .map(|meal| escape_markdown_v2(meal))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "📝 *{}:*\n\
        ```\n\
        Name     : {}\n\
        Height   : {} cm\n\
        Weight   : {} kg\n\
        Age      : {}\n\
        Gender   : {}\n\
        Diet     : {}\n\
        Activity : {}\n\
        Goal     : {}\n\
        ```\n\n\
        📊 *BMI:* {} \\({}\\)\n\
        🔥 *Calories Needed:* {} kcal\n\n\
        🍽️ *Your Meal Plan:*\n\
        {}\n\n\
        💬 Type /reset if you want to create a new plan\\.\n\
        ❤️ Thanks for connecting with us\\. Developed by *Munish Kumar*\\.",
        heading,
        escape_code_entity(&profile.name),
        profile.height,
        profile.weight,
        profile.age,
        profile.gender,
        profile.diet,
        profile.activity,
        profile.goal,
        escape_markdown_v2(&format!("{:.1}", profile.bmi)),
        status,
        profile.calories,
        meals,
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::store::testing::ManualClock;
    use super::*;
    use crate::database::StoreError;

    #[derive(Default)]
    struct MockProfiles {
        profiles: Mutex<HashMap<ChatId, Profile>>,
        fail_writes: AtomicBool,
        fail_reads: AtomicBool,
    }

    #[async_trait]
    impl ProfileStore for MockProfiles {
        async fn upsert(
            &self,
            chat_id: ChatId,
            profile: NewProfile,
        ) -> Result<Profile, StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Database(sqlx::Error::PoolClosed));
            }
            let mut profiles = self.profiles.lock().unwrap();
            let now = Utc::now();
            let created_at = profiles.get(&chat_id).map(|p| p.created_at).unwrap_or(now);
            let saved = Profile {
                chat_id,
                name: profile.name,
                height: profile.height,
                weight: profile.weight,
                age: profile.age,
                gender: profile.gender,
                diet: profile.diet,
                activity: profile.activity,
                goal: profile.goal,
                bmi: profile.bmi,
                calories: profile.calories,
                meals: profile.meals,
                created_at,
                updated_at: now,
            };
            profiles.insert(chat_id, saved.clone());
            Ok(saved)
        }

        async fn find(&self, chat_id: ChatId) -> Result<Option<Profile>, StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Database(sqlx::Error::PoolClosed));
            }
            Ok(self.profiles.lock().unwrap().get(&chat_id).cloned())
        }

        async fn delete(&self, chat_id: ChatId) -> Result<(), StoreError> {
            self.profiles.lock().unwrap().remove(&chat_id);
            Ok(())
        }
    }

    fn engine() -> (
        DialogEngine,
        Arc<SessionStore>,
        Arc<MockProfiles>,
        Arc<ManualClock>,
    ) {
        let clock = Arc::new(ManualClock::new());
        let sessions = Arc::new(SessionStore::new(clock.clone()));
        let profiles = Arc::new(MockProfiles::default());
        (
            DialogEngine::new(sessions.clone(), profiles.clone()),
            sessions,
            profiles,
            clock,
        )
    }

    fn texts(replies: &[Reply]) -> Vec<String> {
        replies
            .iter()
            .map(|reply| match reply {
                Reply::Text(text) => text.clone(),
                Reply::Choices { text, .. } => text.clone(),
            })
            .collect()
    }

    async fn text(engine: &DialogEngine, id: ChatId, input: &str) -> Vec<Reply> {
        engine.handle(id, Event::Text(input.to_string())).await
    }

    async fn answer_through_age(engine: &DialogEngine, id: ChatId) {
        text(engine, id, "Ana").await;
        text(engine, id, "160").await;
        text(engine, id, "55").await;
        text(engine, id, "25").await;
    }

    async fn answer_all(engine: &DialogEngine, id: ChatId) -> Vec<Reply> {
        answer_through_age(engine, id).await;
        engine
            .handle(id, Event::Choice(Choice::Gender(Gender::Female)))
            .await;
        engine.handle(id, Event::Choice(Choice::Diet(Diet::Veg))).await;
        engine
            .handle(id, Event::Choice(Choice::Activity(Activity::Moderate)))
            .await;
        engine
            .handle(id, Event::Choice(Choice::Goal(Goal::Maintain)))
            .await
    }

    #[tokio::test]
    async fn begin_without_profile_asks_for_name() {
        let (engine, _, _, _) = engine();
        let replies = engine.handle(ChatId(1), Event::Begin).await;
        let texts = texts(&replies);
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("Welcome"));
        assert!(texts[1].contains("name"));
    }

    #[tokio::test]
    async fn full_dialog_saves_a_profile_and_clears_the_session() {
        let (engine, sessions, profiles, _) = engine();
        let id = ChatId(7);

        let replies = answer_all(&engine, id).await;
        assert_eq!(replies.len(), 1);
        assert!(texts(&replies)[0].contains("Your Provided Info"));

        let saved = profiles.find(id).await.unwrap().unwrap();
        assert_eq!(saved.name, "Ana");
        assert_eq!(saved.height, 160);
        assert_eq!(saved.weight, 55);
        assert_eq!(saved.age, 25);
        assert_eq!(saved.gender, Gender::Female);
        assert_eq!(saved.diet, Diet::Veg);
        assert_eq!(saved.bmi, 21.5);
        assert_eq!(saved.calories, 1959);
        assert_eq!(saved.meals.len(), 4);

        assert!(sessions.get(id).await.is_none());
    }

    #[tokio::test]
    async fn non_numeric_input_reprompts_the_same_slot() {
        let (engine, sessions, _, _) = engine();
        let id = ChatId(2);

        text(&engine, id, "Ana").await;
        let replies = text(&engine, id, "tall").await;
        assert!(texts(&replies)[0].contains("valid number for height"));

        let cell = sessions.get(id).await.unwrap();
        {
            let session = cell.lock().await;
            assert_eq!(session.state, DialogState::Height);
            assert!(session.answers.height.is_none());
        }

        let replies = text(&engine, id, "160").await;
        assert!(texts(&replies)[0].contains("weight"));
    }

    #[tokio::test]
    async fn choices_before_earlier_slots_are_ignored() {
        let (engine, sessions, _, _) = engine();
        let id = ChatId(3);

        text(&engine, id, "Ana").await;
        let replies = engine
            .handle(id, Event::Choice(Choice::Gender(Gender::Male)))
            .await;
        assert!(replies.is_empty());

        let cell = sessions.get(id).await.unwrap();
        let session = cell.lock().await;
        assert_eq!(session.state, DialogState::Height);
        assert!(session.answers.gender.is_none());
    }

    #[tokio::test]
    async fn free_text_is_ignored_while_a_button_slot_is_pending() {
        let (engine, sessions, _, _) = engine();
        let id = ChatId(4);

        answer_through_age(&engine, id).await;
        let replies = text(&engine, id, "male").await;
        assert!(replies.is_empty());

        let cell = sessions.get(id).await.unwrap();
        let session = cell.lock().await;
        assert_eq!(session.state, DialogState::Gender);
        assert!(session.answers.gender.is_none());
    }

    #[tokio::test]
    async fn idle_session_restarts_at_the_name_slot() {
        let (engine, sessions, _, clock) = engine();
        let id = ChatId(5);

        text(&engine, id, "Ana").await;
        text(&engine, id, "160").await;

        clock.advance_secs(SESSION_TIMEOUT_SECS + 1);
        let replies = text(&engine, id, "Bob").await;
        assert!(texts(&replies)[0].contains("height"));

        let cell = sessions.get(id).await.unwrap();
        let session = cell.lock().await;
        assert_eq!(session.answers.name.as_deref(), Some("Bob"));
        assert!(session.answers.height.is_none());
    }

    #[tokio::test]
    async fn persistence_failure_keeps_the_answers_for_a_retry() {
        let (engine, sessions, profiles, _) = engine();
        let id = ChatId(6);

        profiles.fail_writes.store(true, Ordering::SeqCst);
        let replies = answer_all(&engine, id).await;
        assert!(texts(&replies)[0].contains("Could not save"));

        {
            let cell = sessions.get(id).await.unwrap();
            let session = cell.lock().await;
            assert_eq!(session.state, DialogState::Goal);
            assert_eq!(session.answers.name.as_deref(), Some("Ana"));
            assert!(session.answers.goal.is_none());
        }

        profiles.fail_writes.store(false, Ordering::SeqCst);
        let replies = engine
            .handle(id, Event::Choice(Choice::Goal(Goal::Maintain)))
            .await;
        assert!(texts(&replies)[0].contains("Your Provided Info"));
        assert!(profiles.find(id).await.unwrap().is_some());
        assert!(sessions.get(id).await.is_none());
    }

    #[tokio::test]
    async fn returning_user_sees_the_saved_plan() {
        let (engine, _, profiles, _) = engine();
        let id = ChatId(8);

        answer_all(&engine, id).await;
        let replies = engine.handle(id, Event::Begin).await;
        let texts = texts(&replies);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Your Saved Info"));
        assert!(texts[0].contains("Ana"));
        assert!(texts[0].contains("1959 kcal"));
        assert!(profiles.find(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn returning_user_status_is_reclassified_from_stored_bmi() {
        let (engine, _, profiles, _) = engine();
        let id = ChatId(9);

        let stored = NewProfile {
            name: "Ana".to_string(),
            height: 160,
            weight: 55,
            age: 25,
            gender: Gender::Female,
            diet: Diet::Veg,
            activity: Activity::Moderate,
            goal: Goal::Maintain,
            bmi: 17.0,
            calories: 1500,
            meals: vec!["🥣 Breakfast: Oats + milk + banana – 375 kcal".to_string()],
        };
        profiles.upsert(id, stored).await.unwrap();

        let replies = engine.handle(id, Event::Begin).await;
        assert!(texts(&replies)[0].contains("Underweight"));
        assert!(texts(&replies)[0].contains("1500 kcal"));
    }

    #[tokio::test]
    async fn reset_deletes_the_profile_and_restarts_the_dialog() {
        let (engine, sessions, profiles, _) = engine();
        let id = ChatId(42);

        answer_all(&engine, id).await;
        assert!(profiles.find(id).await.unwrap().is_some());

        let replies = engine.handle(id, Event::Reset).await;
        let reset_texts = texts(&replies);
        assert!(reset_texts[0].contains("reset"));
        assert!(reset_texts[1].contains("name"));
        assert!(profiles.find(id).await.unwrap().is_none());

        let replies = text(&engine, id, "Carol").await;
        assert!(texts(&replies)[0].contains("height"));

        let cell = sessions.get(id).await.unwrap();
        let session = cell.lock().await;
        assert_eq!(session.answers.name.as_deref(), Some("Carol"));
    }

    #[tokio::test]
    async fn begin_lookup_failure_reports_a_generic_error() {
        let (engine, _, profiles, _) = engine();
        profiles.fail_reads.store(true, Ordering::SeqCst);

        let replies = engine.handle(ChatId(10), Event::Begin).await;
        assert_eq!(replies.len(), 1);
        assert!(texts(&replies)[0].contains("something went wrong"));
    }

    #[tokio::test]
    async fn commands_are_not_treated_as_answers() {
        let (engine, sessions, _, _) = engine();
        let id = ChatId(11);

        let replies = text(&engine, id, "/start").await;
        assert!(replies.is_empty());
        if let Some(cell) = sessions.get(id).await {
            let session = cell.lock().await;
            assert!(session.answers.name.is_none());
        }
    }

    #[tokio::test]
    async fn choice_without_a_session_is_dropped() {
        let (engine, sessions, _, _) = engine();
        let id = ChatId(14);

        let replies = engine
            .handle(id, Event::Choice(Choice::Gender(Gender::Male)))
            .await;
        assert!(replies.is_empty());
        assert!(sessions.get(id).await.is_none());
    }

    #[tokio::test]
    async fn names_with_backticks_keep_the_summary_code_block_balanced() {
        let (engine, _, _, _) = engine();
        let id = ChatId(15);

        text(&engine, id, "Ana```*boom(").await;
        text(&engine, id, "160").await;
        text(&engine, id, "55").await;
        text(&engine, id, "25").await;
        engine
            .handle(id, Event::Choice(Choice::Gender(Gender::Female)))
            .await;
        engine.handle(id, Event::Choice(Choice::Diet(Diet::Veg))).await;
        engine
            .handle(id, Event::Choice(Choice::Activity(Activity::Moderate)))
            .await;
        let replies = engine
            .handle(id, Event::Choice(Choice::Goal(Goal::Maintain)))
            .await;

        let summary = &texts(&replies)[0];
        assert_eq!(summary.matches("```").count(), 2);
        assert!(summary.contains("Ana\\`\\`\\`*boom("));
    }

    #[tokio::test]
    async fn blank_name_is_reprompted() {
        let (engine, _, _, _) = engine();
        let replies = text(&engine, ChatId(12), "   ").await;
        assert!(texts(&replies)[0].contains("name"));
    }
}
