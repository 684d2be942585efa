//! Diet plan computation. Pure and deterministic; the dialog engine
//! guarantees well-formed inputs before calling in.

use std::fmt;

use crate::models::{Activity, CompletedAnswers, Diet, Gender, Goal};

// Fraction of the calorie target assigned to each meal. The four fractions
// sum to 1.0; the rounded per-meal values may drift a few kcal from the
// target, which is accepted.
const BREAKFAST_SHARE: f64 = 0.25;
const LUNCH_SHARE: f64 = 0.35;
const DINNER_SHARE: f64 = 0.25;
const SNACKS_SHARE: f64 = 0.15;

/// BMI classification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmiStatus {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiStatus {
    pub fn classify(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiStatus::Underweight
        } else if bmi < 25.0 {
            BmiStatus::Normal
        } else if bmi < 30.0 {
            BmiStatus::Overweight
        } else {
            BmiStatus::Obese
        }
    }
}

impl fmt::Display for BmiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BmiStatus::Underweight => "Underweight",
            BmiStatus::Normal => "Normal",
            BmiStatus::Overweight => "Overweight",
            BmiStatus::Obese => "Obese",
        };
        f.write_str(label)
    }
}

/// Computed nutrition plan, flattened into the profile on persist.
#[derive(Debug, Clone)]
pub struct Plan {
    pub bmi: f64,
    pub calories: i64,
    pub status: BmiStatus,
    pub meals: Vec<String>,
}

pub fn generate(answers: &CompletedAnswers) -> Plan {
    let raw_bmi = answers.weight as f64 / (answers.height as f64 / 100.0).powi(2);
    let bmi = (raw_bmi * 10.0).round() / 10.0;

    let bmr = basal_metabolic_rate(answers.gender, answers.weight, answers.height, answers.age);
    let tdee = bmr * activity_multiplier(answers.activity);
    let calories = (tdee + f64::from(goal_adjustment(answers.goal))).round() as i64;

    Plan {
        bmi,
        calories,
        status: BmiStatus::classify(bmi),
        meals: meal_plan(answers.diet, calories),
    }
}

/// Mifflin-St Jeor basal metabolic rate.
pub fn basal_metabolic_rate(gender: Gender, weight: i32, height: i32, age: i32) -> f64 {
    let base = 10.0 * weight as f64 + 6.25 * height as f64 - 5.0 * age as f64;
    match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    }
}

pub fn activity_multiplier(activity: Activity) -> f64 {
    match activity {
        Activity::Sedentary => 1.2,
        Activity::Light => 1.375,
        Activity::Moderate => 1.55,
        Activity::Heavy => 1.725,
    }
}

/// Daily kcal adjustment applied on top of the TDEE.
pub fn goal_adjustment(goal: Goal) -> i32 {
    match goal {
        Goal::Lose => -500,
        Goal::Gain => 500,
        Goal::Maintain => 0,
    }
}

fn share(calories: i64, fraction: f64) -> i64 {
    (calories as f64 * fraction).round() as i64
}

fn meal_plan(diet: Diet, calories: i64) -> Vec<String> {
    let breakfast = share(calories, BREAKFAST_SHARE);
    let lunch = share(calories, LUNCH_SHARE);
    let dinner = share(calories, DINNER_SHARE);
    let snacks = share(calories, SNACKS_SHARE);

    match diet {
        Diet::Veg => vec![
            format!("🥣 Breakfast: Oats + milk + banana – {} kcal", breakfast),
            format!("🥗 Lunch: Dal, roti, salad, curd – {} kcal", lunch),
            format!("🍽 Dinner: Paneer sabzi + roti + veggies – {} kcal", dinner),
            format!("🍎 Snacks: Fruits or nuts – {} kcal", snacks),
        ],
        Diet::Vegan => vec![
            format!("🥣 Breakfast: Smoothie with plant milk, oats, and fruit – {} kcal", breakfast),
            format!("🥗 Lunch: Lentils, quinoa, mixed veggies salad – {} kcal", lunch),
            format!("🍽 Dinner: Tofu stir-fry with brown rice – {} kcal", dinner),
            format!("🍎 Snacks: Nuts, seeds, or fruit – {} kcal", snacks),
        ],
        Diet::NonVeg => vec![
            format!("🥣 Breakfast: Eggs + toast + fruit – {} kcal", breakfast),
            format!("🥗 Lunch: Chicken breast + rice + salad – {} kcal", lunch),
            format!("🍽 Dinner: Fish curry + chapati + vegetables – {} kcal", dinner),
            format!("🍎 Snacks: Boiled eggs / nuts – {} kcal", snacks),
        ],
    }
}
