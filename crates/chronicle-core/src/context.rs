//! The enhanced world context handed to decision providers.
//!
//! A plain-text snapshot of everything an agent may act on: the calendar
//! and world scalars, each city with its non-empty stocks and corruption
//! pressure, the corrupted areas, guardians and embers, active events, and
//! the exact ids actions must use. It ends with short guidance on which
//! actions are valid.

use std::fmt::Write as _;

use chronicle_types::{Archetype, CityResource, WorldState};

/// Render the world as provider-facing text.
pub fn build_world_context(world: &WorldState) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== WORLD STATE: DAY {} ===", world.day);
    let _ = writeln!(
        out,
        "Stability: {:.0}/100 | Magic level: {:.0}/100 | Global corruption: {:.0}%",
        world.world_stability, world.magic_level, world.corruption.global
    );
    let _ = writeln!(
        out,
        "Embers collected: {}/{}",
        world.embers.collected_count(),
        world.embers.total
    );

    let _ = writeln!(out, "\n--- CITIES ---");
    for city in world.cities.values() {
        let stocks: Vec<String> = CityResource::ALL
            .iter()
            .filter_map(|&r| {
                let amount = city.resources.amount(r);
                (amount > 0).then(|| format!("{r} {amount}"))
            })
            .collect();
        let stocks = if stocks.is_empty() {
            String::from("nothing in stock")
        } else {
            stocks.join(", ")
        };
        let guardian = city
            .guardian
            .as_ref()
            .map(|g| format!(" | guardian: {}", world.agent_name(g.as_str())))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "- {} (id: {}) | prosperity {} | defense {} | corruption {:.0}% | {stocks}{guardian}",
            city.name,
            city.id,
            city.prosperity,
            city.defenses.total_defense_rating,
            city.corruption_influence
        );
    }

    let _ = writeln!(out, "\n--- CORRUPTED AREAS ---");
    for area in world.corruption.areas.values().filter(|a| a.level > 0.0) {
        let trend = if area.expanding { "expanding" } else { "stable" };
        let _ = writeln!(
            out,
            "- {} (id: {}) | {:.0}% | {trend}",
            area.name, area.id, area.level
        );
    }

    let guardians: Vec<String> = world
        .agents
        .iter()
        .filter(|s| s.archetype() == Archetype::Guardian)
        .map(|s| format!("{} (id: {}) in {}", s.name, s.id, s.location))
        .collect();
    if !guardians.is_empty() {
        let _ = writeln!(out, "\n--- GUARDIANS ---");
        for line in guardians {
            let _ = writeln!(out, "- {line}");
        }
    }

    if !world.active_events.is_empty() {
        let _ = writeln!(out, "\n--- ACTIVE EVENTS ---");
        for event in &world.active_events {
            let location = event
                .location
                .as_ref()
                .map(|c| format!(" at {c}"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "- {}{location}: {} (since day {}, lasts {} days)",
                event.name, event.description, event.start_day, event.duration
            );
        }
    }

    let city_ids: Vec<&str> = world.cities.keys().map(|c| c.as_str()).collect();
    let agent_ids: Vec<String> = world
        .agents
        .iter()
        .map(|s| format!("{} ({})", s.id, s.name))
        .collect();
    let _ = writeln!(out, "\n--- VALID IDS ---");
    let _ = writeln!(out, "Cities: {}", city_ids.join(", "));
    let _ = writeln!(out, "Agents: {}", agent_ids.join(", "));

    let _ = writeln!(out, "\n--- GUIDANCE ---");
    let _ = writeln!(
        out,
        "Use only the ids listed above. MOVE needs a valid city id. TRADE and GIFT need \
         both parties in the same city and the goods in hand. BUILD_DEFENSE only works \
         in the city you stand in. CRAFT_ITEM needs the recipe's materials. CHAT starts \
         a conversation; the other party may answer."
    );

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chronicle_types::CityId;
    use chronicle_world::{add_agent, create_starting_world, guardian_status};

    use super::*;

    #[test]
    fn context_lists_cities_ids_and_guidance() {
        let mut world = create_starting_world();
        add_agent(
            &mut world,
            guardian_status("guardian_1", "Kronos", "time", "city-of-dawn", None),
        )
        .unwrap();
        let text = build_world_context(&world);

        assert!(text.starts_with("=== WORLD STATE: DAY 0 ==="));
        for id in world.cities.keys() {
            assert!(text.contains(id.as_str()));
        }
        assert!(text.contains("Kronos (id: guardian_1) in city-of-dawn"));
        assert!(text.contains("--- GUIDANCE ---"));
    }

    #[test]
    fn empty_stocks_are_omitted() {
        let mut world = create_starting_world();
        let city = world.cities.get_mut(&CityId::new("mystic-grove")).unwrap();
        city.resources.food = 0;
        city.resources.materials = 0;
        city.resources.wealth = 0;
        city.resources.mana = 0;
        let text = build_world_context(&world);
        let line = text
            .lines()
            .find(|l| l.contains("(id: mystic-grove)"))
            .unwrap();
        assert!(line.contains("nothing in stock"));
        assert!(!line.contains("food 0"));
    }
}
