//! Fuzzy resolution of an agent reference to a status record.
//!
//! Decision providers address each other by id, by full name, or by some
//! fragment of a name. [`find_agent`] tries four tiers in order and returns
//! the first hit:
//!
//! 1. exact id,
//! 2. exact name,
//! 3. substring containment in either direction (name contains query, or
//!    query contains name),
//! 4. the same containment test after lowercasing and stripping every
//!    non-alphanumeric character.
//!
//! Within a tier, agents are tried heroes first, then guardians, then
//! townsfolk, each ordered by id, so ties resolve the same way every run.
//! Empty or whitespace-only references never match.

use chronicle_types::{AgentStatus, WorldState};

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    /// The reference was an agent id.
    ExactId,
    /// The reference was an agent's full name.
    ExactName,
    /// Name and reference contain one another.
    Substring,
    /// Name and reference contain one another once normalized.
    Normalized,
}

/// Resolve a reference to an agent, returning the status and the tier.
pub fn find_agent_with_tier<'a>(
    world: &'a WorldState,
    reference: &str,
) -> Option<(&'a AgentStatus, MatchTier)> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if let Some(status) = world.agents.get(reference) {
        return Some((status, MatchTier::ExactId));
    }
    if let Some(status) = world.agents.iter().find(|s| s.name == reference) {
        return Some((status, MatchTier::ExactName));
    }
    if let Some(status) = world
        .agents
        .iter()
        .find(|s| !s.name.is_empty() && (s.name.contains(reference) || reference.contains(&s.name)))
    {
        return Some((status, MatchTier::Substring));
    }

    let wanted = normalize(reference);
    if wanted.is_empty() {
        return None;
    }
    world
        .agents
        .iter()
        .find(|s| {
            let name = normalize(&s.name);
            !name.is_empty() && (name.contains(&wanted) || wanted.contains(&name))
        })
        .map(|status| (status, MatchTier::Normalized))
}

/// Resolve a reference to an agent.
pub fn find_agent<'a>(world: &'a WorldState, reference: &str) -> Option<&'a AgentStatus> {
    find_agent_with_tier(world, reference).map(|(status, _)| status)
}

/// Lowercase and keep only alphanumeric characters.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chronicle_types::{AgentId, ArchetypeProfile, CityId};

    use super::*;

    fn agent(id: &str, name: &str, profile: ArchetypeProfile) -> AgentStatus {
        AgentStatus {
            id: AgentId::new(id),
            name: name.to_owned(),
            location: CityId::new("city-of-dawn"),
            hp: 100,
            max_hp: 100,
            power: 10,
            inventory: Default::default(),
            allies: Vec::new(),
            relationships: Default::default(),
            profile,
        }
    }

    fn hero(id: &str, name: &str) -> AgentStatus {
        agent(
            id,
            name,
            ArchetypeProfile::Hero {
                path: String::from("burden"),
                level: 1,
                experience: 0,
                embers_collected: Vec::new(),
            },
        )
    }

    fn world() -> WorldState {
        let mut world = WorldState::default();
        world.agents.insert(hero("hero_1", "Phainon"));
        world.agents.insert(hero("hero_2", "Aglaea the Weaver"));
        world.agents.insert(agent(
            "guardian_1",
            "Kronos",
            ArchetypeProfile::Guardian {
                domain: String::from("time"),
                ember_guarded: None,
                awakening: 0,
                respect_for_challengers: Default::default(),
            },
        ));
        world
    }

    #[test]
    fn tiers_are_tried_in_order() {
        let world = world();
        let (s, tier) = find_agent_with_tier(&world, "hero_2").unwrap();
        assert_eq!((s.id.as_str(), tier), ("hero_2", MatchTier::ExactId));

        let (s, tier) = find_agent_with_tier(&world, "Kronos").unwrap();
        assert_eq!((s.id.as_str(), tier), ("guardian_1", MatchTier::ExactName));

        let (s, tier) = find_agent_with_tier(&world, "Aglaea").unwrap();
        assert_eq!((s.id.as_str(), tier), ("hero_2", MatchTier::Substring));

        let (s, tier) = find_agent_with_tier(&world, "Lord Phainon").unwrap();
        assert_eq!((s.id.as_str(), tier), ("hero_1", MatchTier::Substring));

        let (s, tier) = find_agent_with_tier(&world, "aglaea-the-weaver!").unwrap();
        assert_eq!((s.id.as_str(), tier), ("hero_2", MatchTier::Normalized));
    }

    #[test]
    fn empty_references_never_match() {
        let world = world();
        assert!(find_agent(&world, "").is_none());
        assert!(find_agent(&world, "   ").is_none());
        assert!(find_agent(&world, "!!!").is_none());
    }

    #[test]
    fn unknown_references_do_not_match() {
        assert!(find_agent(&world(), "Nobody").is_none());
    }

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Mr. O'Brien-Smith"), "mrobriensmith");
    }
}
