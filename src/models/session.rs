use chrono::{DateTime, Utc};

use super::{Activity, Diet, Gender, Goal};

/// Which slot the dialog is waiting on. Kept explicitly on the session
/// rather than derived from which answers happen to be filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Name,
    Height,
    Weight,
    Age,
    Gender,
    Diet,
    Activity,
    Goal,
    Complete,
}

/// Partially collected questionnaire answers, filled strictly in slot order.
#[derive(Debug, Clone, Default)]
pub struct Answers {
    pub name: Option<String>,
    pub height: Option<i32>,
    pub weight: Option<i32>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub diet: Option<Diet>,
    pub activity: Option<Activity>,
    pub goal: Option<Goal>,
}

impl Answers {
    /// Returns the concrete answer set once every slot is filled.
    pub fn completed(&self) -> Option<CompletedAnswers> {
        Some(CompletedAnswers {
            name: self.name.clone()?,
            height: self.height?,
            weight: self.weight?,
            age: self.age?,
            gender: self.gender?,
            diet: self.diet?,
            activity: self.activity?,
            goal: self.goal?,
        })
    }
}

/// A fully answered questionnaire, ready for plan computation.
#[derive(Debug, Clone)]
pub struct CompletedAnswers {
    pub name: String,
    pub height: i32,
    pub weight: i32,
    pub age: i32,
    pub gender: Gender,
    pub diet: Diet,
    pub activity: Activity,
    pub goal: Goal,
}

/// One in-progress dialog. In-memory only; lost on restart by design.
#[derive(Debug, Clone)]
pub struct Session {
    pub last_active: DateTime<Utc>,
    pub state: DialogState,
    pub answers: Answers,
}

impl Session {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Session {
            last_active: now,
            state: DialogState::Name,
            answers: Answers::default(),
        }
    }
}
