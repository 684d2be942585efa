pub mod choice;
pub mod profile;
pub mod session;

pub use choice::{Activity, Choice, Diet, Gender, Goal};
pub use profile::{NewProfile, Profile};
pub use session::{CompletedAnswers, DialogState, Session};
