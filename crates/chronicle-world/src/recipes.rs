//! The crafting recipe table.
//!
//! Recipes are keyed by the item they produce (`"wooden_shield"`).
//! [`get_recipe`] accepts display-style names too: `"Wooden Shield"` and
//! `"wooden-shield"` resolve to the same entry.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chronicle_types::{Recipe, RecipeCategory, RecipeDifficulty, RecipeOutput};

/// Helper to build a [`Recipe`] producing one unit.
fn recipe(
    name: &str,
    item: &str,
    materials: &[(&str, u32)],
    category: RecipeCategory,
    difficulty: RecipeDifficulty,
    crafting_time: u32,
) -> Recipe {
    Recipe {
        name: name.to_owned(),
        materials: materials
            .iter()
            .map(|(material, amount)| ((*material).to_owned(), *amount))
            .collect(),
        output: RecipeOutput {
            item: item.to_owned(),
            quantity: 1,
        },
        category,
        difficulty,
        crafting_time,
    }
}

static RECIPES: LazyLock<BTreeMap<String, Recipe>> = LazyLock::new(|| {
    use RecipeCategory::{Armor, Defense, Magical, Tool, Weapon};
    use RecipeDifficulty::{Advanced, Basic, Intermediate};

    [
        recipe("Wooden Shield", "wooden_shield", &[("wood", 3)], Defense, Basic, 1),
        recipe("Stone Sword", "stone_sword", &[("stone", 2), ("wood", 1)], Weapon, Basic, 1),
        recipe("Wooden Spear", "wooden_spear", &[("wood", 4)], Weapon, Basic, 1),
        recipe("Stone Hammer", "stone_hammer", &[("stone", 3), ("wood", 2)], Tool, Basic, 2),
        recipe("Basic Tool", "basic_tool", &[("wood", 2), ("stone", 1)], Tool, Basic, 1),
        recipe("Leather Armor", "leather_armor", &[("food", 5), ("wood", 1)], Armor, Basic, 2),
        recipe(
            "Iron Sword",
            "iron_sword",
            &[("stone", 4), ("wood", 2), ("mana_crystal", 1)],
            Weapon,
            Intermediate,
            3,
        ),
        recipe("Steel Blade", "steel_blade", &[("stone", 6), ("mana_crystal", 2)], Weapon, Intermediate, 4),
        recipe("Chain Mail", "chain_mail", &[("stone", 5), ("mana_crystal", 2)], Armor, Intermediate, 4),
        recipe("Advanced Tool", "advanced_tool", &[("stone", 3), ("mana_crystal", 1)], Tool, Intermediate, 2),
        recipe(
            "Enchanted Blade",
            "enchanted_blade",
            &[("stone", 3), ("wood", 2), ("mana_crystal", 3)],
            Weapon,
            Advanced,
            5,
        ),
        recipe("Mana Staff", "mana_staff", &[("wood", 3), ("mana_crystal", 4)], Magical, Advanced, 4),
        recipe("Enchanted Armor", "enchanted_armor", &[("stone", 4), ("mana_crystal", 5)], Armor, Advanced, 6),
    ]
    .into_iter()
    .map(|r| (r.output.item.clone(), r))
    .collect()
});

/// Normalize an item name to a recipe key: lowercase, with spaces and
/// dashes turned into underscores.
pub fn recipe_key(item_name: &str) -> String {
    item_name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Look up the recipe producing `item_name`.
pub fn get_recipe(item_name: &str) -> Option<&'static Recipe> {
    RECIPES.get(&recipe_key(item_name))
}

/// Every recipe, ordered by key.
pub fn all_recipes() -> impl Iterator<Item = &'static Recipe> {
    RECIPES.values()
}

/// Recipes whose materials are all covered by `inventory`.
pub fn available_recipes(inventory: &BTreeMap<String, u32>) -> Vec<&'static Recipe> {
    RECIPES
        .values()
        .filter(|recipe| {
            recipe
                .materials
                .iter()
                .all(|(material, needed)| inventory.get(material).copied().unwrap_or(0) >= *needed)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn wooden_shield_needs_three_wood() {
        let recipe = get_recipe("wooden_shield").unwrap();
        assert_eq!(recipe.materials.get("wood"), Some(&3));
        assert_eq!(recipe.output.quantity, 1);
    }

    #[test]
    fn lookup_normalizes_display_names() {
        assert_eq!(get_recipe("Stone Sword").unwrap().output.item, "stone_sword");
        assert_eq!(get_recipe("mana-staff").unwrap().output.item, "mana_staff");
        assert!(get_recipe("dragon_egg").is_none());
    }

    #[test]
    fn available_recipes_respect_inventory() {
        let inventory: BTreeMap<String, u32> =
            [("wood".to_owned(), 4), ("stone".to_owned(), 1)].into_iter().collect();
        let items: Vec<_> = available_recipes(&inventory)
            .into_iter()
            .map(|r| r.output.item.as_str())
            .collect();
        assert!(items.contains(&"wooden_shield"));
        assert!(items.contains(&"wooden_spear"));
        assert!(items.contains(&"basic_tool"));
        assert!(!items.contains(&"stone_sword"));
    }

    #[test]
    fn every_recipe_is_keyed_by_its_output() {
        for recipe in all_recipes() {
            assert_eq!(get_recipe(&recipe.output.item), Some(recipe));
        }
    }
}
