//! Material bookkeeping for the `CRAFT_ITEM` action.
//!
//! The recipe table itself lives in `chronicle-world`; this module decides
//! which materials a craft consumes and what the actor is short of.

use std::collections::BTreeMap;

use chronicle_types::Recipe;

// ---------------------------------------------------------------------------
// Material resolution
// ---------------------------------------------------------------------------

/// The materials a craft consumes.
///
/// An action-supplied override wins when it names at least one material with
/// a non-zero quantity; otherwise the recipe's own list applies.
pub fn resolve_materials(
    recipe: &Recipe,
    requested: &BTreeMap<String, u32>,
) -> BTreeMap<String, u32> {
    let override_materials: BTreeMap<String, u32> = requested
        .iter()
        .filter(|&(_, &quantity)| quantity > 0)
        .map(|(item, &quantity)| (item.clone(), quantity))
        .collect();
    if override_materials.is_empty() {
        recipe.materials.clone()
    } else {
        override_materials
    }
}

/// Quantities still missing from `inventory` to cover `required`.
///
/// Empty when the inventory holds everything.
pub fn missing_materials(
    inventory: &BTreeMap<String, u32>,
    required: &BTreeMap<String, u32>,
) -> BTreeMap<String, u32> {
    required
        .iter()
        .filter_map(|(item, &needed)| {
            let held = inventory.get(item).copied().unwrap_or(0);
            let short = needed.saturating_sub(held);
            (short > 0).then(|| (item.clone(), short))
        })
        .collect()
}

/// Render quantities as `"2 stone, 1 wood"`.
pub fn format_quantities(quantities: &BTreeMap<String, u32>) -> String {
    quantities
        .iter()
        .map(|(item, quantity)| format!("{quantity} {item}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn inventory(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|&(k, v)| (k.to_owned(), v)).collect()
    }

    #[test]
    fn recipe_materials_apply_without_override() {
        let recipe = chronicle_world::get_recipe("wooden_shield").unwrap();
        let materials = resolve_materials(recipe, &BTreeMap::new());
        assert_eq!(materials, inventory(&[("wood", 3)]));
    }

    #[test]
    fn override_replaces_recipe_materials() {
        let recipe = chronicle_world::get_recipe("wooden_shield").unwrap();
        let materials = resolve_materials(recipe, &inventory(&[("wood", 5), ("iron", 0)]));
        assert_eq!(materials, inventory(&[("wood", 5)]));
    }

    #[test]
    fn missing_materials_reports_shortfall_only() {
        let held = inventory(&[("wood", 1), ("stone", 4)]);
        let needed = inventory(&[("wood", 3), ("stone", 2), ("iron", 1)]);
        let missing = missing_materials(&held, &needed);
        assert_eq!(missing, inventory(&[("iron", 1), ("wood", 2)]));
        assert_eq!(format_quantities(&missing), "1 iron, 2 wood");
    }
}
