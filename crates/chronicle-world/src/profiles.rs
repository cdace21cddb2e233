//! Townsfolk role profiles: starting hp, strength, inventory, preferred
//! cities, and skills for each [`TownsfolkRole`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chronicle_types::{CityId, RoleProfile, TownsfolkRole};

fn profile(
    role: TownsfolkRole,
    title: &str,
    max_hp: u32,
    power: u32,
    inventory: &[(&str, u32)],
    preferred: &[&str],
    skills: &[&str],
) -> RoleProfile {
    RoleProfile {
        role,
        title: title.to_owned(),
        max_hp,
        power,
        starting_inventory: inventory
            .iter()
            .map(|(item, amount)| ((*item).to_owned(), *amount))
            .collect(),
        preferred_locations: preferred.iter().map(|id| CityId::from(*id)).collect(),
        skills: skills.iter().map(|s| (*s).to_owned()).collect(),
    }
}

static PROFILES: LazyLock<BTreeMap<TownsfolkRole, RoleProfile>> = LazyLock::new(|| {
    [
        profile(
            TownsfolkRole::Merchant,
            "Merchant",
            60,
            8,
            &[("wood", 3), ("stone", 2), ("coins", 50)],
            &["city-of-dawn", "fortress-of-dusk"],
            &["Trading", "Appraisal", "Negotiation", "Market Analysis"],
        ),
        profile(
            TownsfolkRole::Guard,
            "Guard",
            120,
            20,
            &[("stone", 5), ("iron", 2)],
            &["fortress-of-dusk", "city-of-dawn"],
            &["Combat", "Patrol", "Threat Assessment", "Crowd Control"],
        ),
        profile(
            TownsfolkRole::Scholar,
            "Scholar",
            50,
            5,
            &[("mana_crystal", 3), ("scroll", 2)],
            &["academy-quarter", "mystic-grove", "crystal-caverns"],
            &["Research", "Ancient Languages", "Magic Theory", "Lore Keeping"],
        ),
        profile(
            TownsfolkRole::Craftsman,
            "Craftsman",
            80,
            12,
            &[("wood", 4), ("stone", 3), ("iron", 1)],
            &["ember-forges", "city-of-dawn"],
            &["Smithing", "Woodworking", "Engineering", "Material Science"],
        ),
    ]
    .into_iter()
    .map(|p| (p.role, p))
    .collect()
});

/// Look up the profile for a role.
pub fn role_profile(role: TownsfolkRole) -> Option<&'static RoleProfile> {
    PROFILES.get(&role)
}
