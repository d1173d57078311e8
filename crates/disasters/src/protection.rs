//! Protective gear: which items dampen which disasters, and by how much.

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, DisasterKind};
use crate::error::{DisasterError, Result};

/// No protection.
pub const UNPROTECTED: f32 = 1.0;

/// Identifier of an equipment item, as used by the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One item and the archetypes it protects against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionRule {
    pub item: ItemId,
    pub kinds: Vec<DisasterKind>,
    /// Multiplier applied to the penalty, in `(0, 1]`.
    pub factor: f32,
}

impl ProtectionRule {
    pub fn new(item: &str, kinds: &[DisasterKind], factor: f32) -> Self {
        Self { item: item.into(), kinds: kinds.to_vec(), factor }
    }
}

/// Item → (archetypes, damping factor) lookup.
#[derive(Debug, Clone, Default)]
pub struct ProtectionTable {
    rules: Vec<ProtectionRule>,
}

impl ProtectionTable {
    pub fn standard_rules() -> Vec<ProtectionRule> {
        use DisasterKind::*;
        vec![
            ProtectionRule::new("umbrella", &[Rainstorm, Thunderstorm], 0.7),
            ProtectionRule::new("winter_coat", &[Blizzard], 0.6),
            ProtectionRule::new("goggles", &[Sandstorm], 0.65),
            ProtectionRule::new("storm_anchor", &[Tornado], 0.6),
            ProtectionRule::new("cooling_pack", &[Heatwave], 0.7),
            ProtectionRule::new("heat_shield", &[Eruption, Heatwave], 0.6),
        ]
    }

    /// Validate rules against the catalog. Unknown kinds are a startup error.
    pub fn from_rules(rules: Vec<ProtectionRule>, catalog: &Catalog) -> Result<Self> {
        for rule in &rules {
            if !(rule.factor.is_finite() && rule.factor > 0.0 && rule.factor <= 1.0) {
                return Err(DisasterError::InvalidConfig(format!(
                    "protection factor {} for {} must be in (0, 1]",
                    rule.factor, rule.item
                )));
            }
            for &kind in &rule.kinds {
                catalog.require(kind)?;
            }
        }
        Ok(Self { rules })
    }

    /// Damping factor for `kind` given a predicate answering "is this item
    /// equipped?". Overlapping items use the strongest (lowest) factor.
    pub fn damping_factor(&self, kind: DisasterKind, has_item: impl Fn(&ItemId) -> bool) -> f32 {
        self.rules
            .iter()
            .filter(|r| r.kinds.contains(&kind) && has_item(&r.item))
            .map(|r| r.factor)
            .fold(UNPROTECTED, f32::min)
    }

    pub fn rules(&self) -> &[ProtectionRule] {
        &self.rules
    }
}

/// Scale the deviation of a multiplier from neutral by `factor`.
///
/// `mitigate(0.8, 0.7) == 0.86`: the 0.2 penalty shrinks to 0.14.
pub fn mitigate(multiplier: f32, factor: f32) -> f32 {
    1.0 + (multiplier - 1.0) * factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn table() -> ProtectionTable {
        ProtectionTable::from_rules(ProtectionTable::standard_rules(), &Catalog::standard()).unwrap()
    }

    #[test]
    fn no_items_means_no_protection() {
        let t = table();
        for kind in DisasterKind::ALL {
            assert_eq!(t.damping_factor(kind, |_| false), UNPROTECTED);
        }
    }

    #[test]
    fn item_only_dampens_its_kinds() {
        let t = table();
        let equipped: HashSet<ItemId> = [ItemId::from("umbrella")].into_iter().collect();
        let has = |id: &ItemId| equipped.contains(id);
        assert_eq!(t.damping_factor(DisasterKind::Rainstorm, has), 0.7);
        assert_eq!(t.damping_factor(DisasterKind::Blizzard, has), UNPROTECTED);
    }

    #[test]
    fn strongest_item_wins() {
        let t = table();
        let has = |id: &ItemId| id.0 == "cooling_pack" || id.0 == "heat_shield";
        assert_eq!(t.damping_factor(DisasterKind::Heatwave, has), 0.6);
    }

    #[test]
    fn mitigate_shrinks_penalty() {
        assert!((mitigate(0.8, 0.7) - 0.86).abs() < 1e-6);
        assert!((mitigate(1.3, 0.6) - 1.18).abs() < 1e-6);
        assert_ne!(mitigate(0.8, 0.7), mitigate(0.8, UNPROTECTED));
    }

    #[test]
    fn rule_for_missing_kind_is_rejected() {
        let catalog = Catalog::from_archetypes(vec![crate::catalog::Archetype::standard(DisasterKind::Rainstorm)]).unwrap();
        let err = ProtectionTable::from_rules(ProtectionTable::standard_rules(), &catalog).unwrap_err();
        assert_eq!(err, DisasterError::MissingArchetype(DisasterKind::Thunderstorm));
    }

    #[test]
    fn out_of_range_factor_is_rejected() {
        let rules = vec![ProtectionRule::new("umbrella", &[DisasterKind::Rainstorm], 1.5)];
        assert!(matches!(
            ProtectionTable::from_rules(rules, &Catalog::standard()),
            Err(DisasterError::InvalidConfig(_))
        ));
    }
}
