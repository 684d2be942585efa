use std::fmt;

use serde::{Deserialize, Serialize};

/// Gender options offered on the gender keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    fn token(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }

    /// Parses the stored column value. Unrecognized values take the female
    /// branch, matching the BMR formula's fallthrough.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "Male" | "male" => Gender::Male,
            _ => Gender::Female,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Diet preference; selects the meal template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diet {
    Veg,
    NonVeg,
    Vegan,
}

impl Diet {
    pub fn label(&self) -> &'static str {
        match self {
            Diet::Veg => "Vegetarian",
            Diet::NonVeg => "Non-Vegetarian",
            Diet::Vegan => "Vegan",
        }
    }

    fn token(&self) -> &'static str {
        match self {
            Diet::Veg => "veg",
            Diet::NonVeg => "nonveg",
            Diet::Vegan => "vegan",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "veg" => Some(Diet::Veg),
            "nonveg" => Some(Diet::NonVeg),
            "vegan" => Some(Diet::Vegan),
            _ => None,
        }
    }

    /// Unrecognized stored values fall back to the non-vegetarian template.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "Vegetarian" | "veg" => Diet::Veg,
            "Vegan" | "vegan" => Diet::Vegan,
            _ => Diet::NonVeg,
        }
    }
}

impl fmt::Display for Diet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Activity level; selects the TDEE multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activity {
    Sedentary,
    Light,
    Moderate,
    Heavy,
}

impl Activity {
    pub fn label(&self) -> &'static str {
        match self {
            Activity::Sedentary => "Sedentary",
            Activity::Light => "Light",
            Activity::Moderate => "Moderate",
            Activity::Heavy => "Heavy",
        }
    }

    fn token(&self) -> &'static str {
        match self {
            Activity::Sedentary => "sedentary",
            Activity::Light => "light",
            Activity::Moderate => "moderate",
            Activity::Heavy => "heavy",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "sedentary" => Some(Activity::Sedentary),
            "light" => Some(Activity::Light),
            "moderate" => Some(Activity::Moderate),
            "heavy" => Some(Activity::Heavy),
            _ => None,
        }
    }

    /// Parses the stored column value. "low" is a legacy alias for
    /// sedentary; unrecognized values default to sedentary.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "Light" | "light" => Activity::Light,
            "Moderate" | "moderate" => Activity::Moderate,
            "Heavy" | "heavy" => Activity::Heavy,
            _ => Activity::Sedentary,
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Weight goal; selects the calorie adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    Lose,
    Gain,
    Maintain,
}

impl Goal {
    pub fn label(&self) -> &'static str {
        match self {
            Goal::Lose => "Lose Weight",
            Goal::Gain => "Gain Weight",
            Goal::Maintain => "Maintain Weight",
        }
    }

    /// Canonical form written to the profile record.
    pub fn stored(&self) -> &'static str {
        match self {
            Goal::Lose => "Lose weight",
            Goal::Gain => "Gain weight",
            Goal::Maintain => "Maintain weight",
        }
    }

    fn token(&self) -> &'static str {
        match self {
            Goal::Lose => "lose",
            Goal::Gain => "gain",
            Goal::Maintain => "maintain",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "lose" => Some(Goal::Lose),
            "gain" => Some(Goal::Gain),
            "maintain" => Some(Goal::Maintain),
            _ => None,
        }
    }

    /// Unrecognized stored values default to maintaining weight.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "Lose weight" | "lose" => Goal::Lose,
            "Gain weight" | "gain" => Goal::Gain,
            _ => Goal::Maintain,
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stored())
    }
}

/// A button selection for one of the four enum slots. Built from and
/// rendered to the `category_value` callback payload only at the transport
/// boundary; the dialog engine never sees the wire string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Gender(Gender),
    Diet(Diet),
    Activity(Activity),
    Goal(Goal),
}

impl Choice {
    pub fn label(&self) -> &'static str {
        match self {
            Choice::Gender(g) => g.label(),
            Choice::Diet(d) => d.label(),
            Choice::Activity(a) => a.label(),
            Choice::Goal(g) => g.label(),
        }
    }

    pub fn callback_data(&self) -> String {
        let (category, token) = match self {
            Choice::Gender(g) => ("gender", g.token()),
            Choice::Diet(d) => ("diet", d.token()),
            Choice::Activity(a) => ("activity", a.token()),
            Choice::Goal(g) => ("goal", g.token()),
        };
        format!("{}_{}", category, token)
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        let (category, value) = data.split_once('_')?;
        match category {
            "gender" => Gender::from_token(value).map(Choice::Gender),
            "diet" => Diet::from_token(value).map(Choice::Diet),
            "activity" => Activity::from_token(value).map(Choice::Activity),
            "goal" => Goal::from_token(value).map(Choice::Goal),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_data_round_trips() {
        let choices = [
            Choice::Gender(Gender::Male),
            Choice::Gender(Gender::Female),
            Choice::Diet(Diet::Veg),
            Choice::Diet(Diet::NonVeg),
            Choice::Diet(Diet::Vegan),
            Choice::Activity(Activity::Sedentary),
            Choice::Activity(Activity::Heavy),
            Choice::Goal(Goal::Lose),
            Choice::Goal(Goal::Maintain),
        ];
        for choice in choices {
            let data = choice.callback_data();
            assert_eq!(Choice::from_callback_data(&data), Some(choice));
        }
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert_eq!(Choice::from_callback_data("gender"), None);
        assert_eq!(Choice::from_callback_data("gender_"), None);
        assert_eq!(Choice::from_callback_data("diet_beef"), None);
        assert_eq!(Choice::from_callback_data("mood_happy"), None);
        assert_eq!(Choice::from_callback_data(""), None);
    }

    #[test]
    fn stored_values_parse_with_aliases() {
        assert_eq!(Activity::from_stored("Sedentary"), Activity::Sedentary);
        assert_eq!(Activity::from_stored("low"), Activity::Sedentary);
        assert_eq!(Activity::from_stored("whatever"), Activity::Sedentary);
        assert_eq!(Gender::from_stored("Male"), Gender::Male);
        assert_eq!(Gender::from_stored("other"), Gender::Female);
        assert_eq!(Diet::from_stored("Vegetarian"), Diet::Veg);
        assert_eq!(Diet::from_stored("mystery"), Diet::NonVeg);
        assert_eq!(Goal::from_stored("Lose weight"), Goal::Lose);
        assert_eq!(Goal::from_stored("unknown"), Goal::Maintain);
    }
}
