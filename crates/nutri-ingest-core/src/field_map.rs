//! Per-source field-mapping tables.
//!
//! Each source names the same concept differently (`product_name` vs `name`
//! vs `Description`). A [`FieldMap`] lists, for every canonical field, the
//! ordered source keys that may carry it. Resolution takes the first key
//! present with a non-blank value. Keys are matched exactly; a dotted key
//! (`nutriments.fat_100g`) also reaches into nested objects.
//!
//! The built-in tables below are the complete mapping for the three known
//! sources. A config file may replace any of them wholesale.

use serde::Deserialize;

use crate::models::SourceKind;

/// Source keys for one canonical nutrient.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NutrientKeys {
    /// Canonical nutrient name (e.g. `protein_g`).
    pub nutrient: String,
    /// Source keys, in priority order.
    pub keys: Vec<String>,
}

/// Field-name table for one source schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldMap {
    pub name: Vec<String>,
    #[serde(default)]
    pub brand: Vec<String>,
    #[serde(default)]
    pub nutrients: Vec<NutrientKeys>,
    #[serde(default)]
    pub serving_amount: Vec<String>,
    #[serde(default)]
    pub serving_unit: Vec<String>,
    /// Unit to use when a serving amount is present but no unit key is.
    #[serde(default)]
    pub serving_unit_default: Option<String>,
}

/// The three field maps, one per [`SourceKind`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldMaps {
    #[serde(default = "FieldMap::api")]
    pub api: FieldMap,
    #[serde(default = "FieldMap::flat_file")]
    pub flat_file: FieldMap,
    #[serde(default = "FieldMap::document")]
    pub document: FieldMap,
}

impl Default for FieldMaps {
    fn default() -> Self {
        Self {
            api: FieldMap::api(),
            flat_file: FieldMap::flat_file(),
            document: FieldMap::document(),
        }
    }
}

impl FieldMaps {
    pub fn for_source(&self, kind: SourceKind) -> &FieldMap {
        match kind {
            SourceKind::Api => &self.api,
            SourceKind::FlatFile => &self.flat_file,
            SourceKind::Document => &self.document,
        }
    }
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

fn nutrient(name: &str, list: &[&str]) -> NutrientKeys {
    NutrientKeys {
        nutrient: name.to_string(),
        keys: keys(list),
    }
}

impl FieldMap {
    /// Product objects returned by the remote foods API.
    pub fn api() -> Self {
        Self {
            name: keys(&["product_name", "name", "description"]),
            brand: keys(&["brands", "brand", "brand_owner"]),
            nutrients: vec![
                nutrient("calories", &["nutriments.energy-kcal_100g", "calories"]),
                nutrient("protein_g", &["nutriments.proteins_100g", "protein"]),
                nutrient("fat_g", &["nutriments.fat_100g", "fat"]),
                nutrient(
                    "carbohydrates_g",
                    &["nutriments.carbohydrates_100g", "carbohydrates"],
                ),
                nutrient("sugar_g", &["nutriments.sugars_100g", "sugar"]),
                nutrient("fiber_g", &["nutriments.fiber_100g", "fiber"]),
                nutrient("sodium_mg", &["nutriments.sodium_mg", "sodium"]),
            ],
            serving_amount: keys(&["serving_quantity"]),
            serving_unit: keys(&["serving_quantity_unit"]),
            serving_unit_default: Some("g".to_string()),
        }
    }

    /// Header names of the delimited export (lowercase and spreadsheet-style).
    pub fn flat_file() -> Self {
        Self {
            name: keys(&["name", "Name", "Description"]),
            brand: keys(&["brand", "Brand", "Manufacturer"]),
            nutrients: vec![
                nutrient("calories", &["calories", "Calories"]),
                nutrient("protein_g", &["protein", "Protein (g)"]),
                nutrient("fat_g", &["fat", "Fat (g)"]),
                nutrient("carbohydrates_g", &["carbohydrates", "Carbohydrate (g)"]),
                nutrient("sugar_g", &["sugar", "Sugars (g)"]),
                nutrient("fiber_g", &["fiber", "Fiber (g)"]),
                nutrient("sodium_mg", &["sodium", "Sodium (mg)"]),
            ],
            serving_amount: keys(&["serving_amount", "Serving Weight 1 (g)"]),
            serving_unit: keys(&["serving_unit"]),
            serving_unit_default: Some("g".to_string()),
        }
    }

    /// Objects in a structured-document dump.
    pub fn document() -> Self {
        Self {
            name: keys(&["name", "food_name", "description"]),
            brand: keys(&["brand", "brand_name", "brand_owner"]),
            nutrients: vec![
                nutrient("calories", &["calories", "energy_kcal", "nutrients.calories"]),
                nutrient("protein_g", &["protein_g", "protein", "nutrients.protein_g"]),
                nutrient("fat_g", &["fat_g", "fat", "nutrients.fat_g"]),
                nutrient(
                    "carbohydrates_g",
                    &["carbohydrates_g", "carbs", "nutrients.carbohydrates_g"],
                ),
                nutrient("sugar_g", &["sugar_g", "sugar", "nutrients.sugar_g"]),
                nutrient("fiber_g", &["fiber_g", "fiber", "nutrients.fiber_g"]),
                nutrient("sodium_mg", &["sodium_mg", "sodium", "nutrients.sodium_mg"]),
            ],
            serving_amount: keys(&["serving.amount", "serving_size"]),
            serving_unit: keys(&["serving.unit", "serving_size_unit"]),
            serving_unit_default: None,
        }
    }

    /// Check the table is usable: at least one name key, no blank keys, and
    /// no nutrient listed twice.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("field map must list at least one name key".to_string());
        }
        let all_keys = self
            .name
            .iter()
            .chain(&self.brand)
            .chain(&self.serving_amount)
            .chain(&self.serving_unit)
            .chain(self.nutrients.iter().flat_map(|n| n.keys.iter()));
        for key in all_keys {
            if key.trim().is_empty() {
                return Err("field map contains a blank key".to_string());
            }
        }
        let mut seen = std::collections::HashSet::new();
        for n in &self.nutrients {
            if n.nutrient.trim().is_empty() {
                return Err("field map contains a blank nutrient name".to_string());
            }
            if !seen.insert(n.nutrient.as_str()) {
                return Err(format!("nutrient '{}' is mapped twice", n.nutrient));
            }
        }
        Ok(())
    }
}
