//! Food, water and custom food rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl Meal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Meal::Breakfast => "breakfast",
            Meal::Lunch => "lunch",
            Meal::Dinner => "dinner",
            Meal::Snack => "snack",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "breakfast" => Some(Meal::Breakfast),
            "lunch" => Some(Meal::Lunch),
            "dinner" => Some(Meal::Dinner),
            "snack" => Some(Meal::Snack),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FoodSource {
    Manual,
    Photo,
    Custom,
}

impl FoodSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodSource::Manual => "manual",
            FoodSource::Photo => "photo",
            FoodSource::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(FoodSource::Manual),
            "photo" => Some(FoodSource::Photo),
            "custom" => Some(FoodSource::Custom),
            _ => None,
        }
    }
}

/// Macronutrients of a food item or a day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl std::ops::AddAssign for Macros {
    fn add_assign(&mut self, other: Self) {
        self.calories += other.calories;
        self.protein += other.protein;
        self.carbs += other.carbs;
        self.fats += other.fats;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodLog {
    pub id: String,
    pub user_id: String,
    pub logged_on: NaiveDate,
    pub meal: Meal,
    pub name: String,
    #[serde(flatten)]
    pub macros: Macros,
    pub quantity: f64,
    pub unit: String,
    pub source: FoodSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaterLog {
    pub id: String,
    pub user_id: String,
    pub logged_on: NaiveDate,
    pub amount_ml: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomFood {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(flatten)]
    pub macros: Macros,
    pub serving_quantity: f64,
    pub serving_unit: String,
}

impl CustomFood {
    /// Macros scaled to `quantity` in this food's serving unit.
    pub fn macros_for(&self, quantity: f64) -> Macros {
        let factor = if self.serving_quantity > 0.0 {
            quantity / self.serving_quantity
        } else {
            0.0
        };
        Macros {
            calories: self.macros.calories * factor,
            protein: self.macros.protein * factor,
            carbs: self.macros.carbs * factor,
            fats: self.macros.fats * factor,
        }
    }
}
