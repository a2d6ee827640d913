//! Tail segment merging
//!
//! A scan walks the live chain head to tail and stops at the first match.
//! At each position a 3-input evolution (ordered) is tried before the 2-input
//! matches: same weapon and tier promote the pair, otherwise an unordered
//! synergy recipe may convert it. The first segment of the match absorbs the
//! result; the rest expire.

use super::entities::TailSegment;
use super::weapons::WeaponKind;
use crate::consts::MAX_TIER;

/// Unordered 2-input recipes
const SYNERGIES: [(WeaponKind, WeaponKind, WeaponKind); 4] = [
    (WeaponKind::MagicWand, WeaponKind::Lightning, WeaponKind::StormStaff),
    (WeaponKind::FireBottle, WeaponKind::FrostNova, WeaponKind::Frostfire),
    (WeaponKind::Knife, WeaponKind::Boomerang, WeaponKind::Glaive),
    (WeaponKind::Garlic, WeaponKind::Tornado, WeaponKind::Miasma),
];

/// Ordered 3-input recipes (head to tail)
const EVOLUTIONS: [([WeaponKind; 3], WeaponKind); 2] = [
    (
        [WeaponKind::Flamethrower, WeaponKind::Laser, WeaponKind::Lightning],
        WeaponKind::Sunbeam,
    ),
    (
        [WeaponKind::Spear, WeaponKind::Blossom, WeaponKind::SpellOrb],
        WeaponKind::ThousandPetals,
    ),
];

/// Result of a synergy between `a` and `b`, in either order
pub fn synergy(a: WeaponKind, b: WeaponKind) -> Option<WeaponKind> {
    SYNERGIES
        .iter()
        .find(|(x, y, _)| (*x == a && *y == b) || (*x == b && *y == a))
        .map(|&(_, _, result)| result)
}

/// Result of an evolution for exactly this head-to-tail order
pub fn evolution(inputs: [WeaponKind; 3]) -> Option<WeaponKind> {
    EVOLUTIONS.iter().find(|(recipe, _)| *recipe == inputs).map(|&(_, result)| result)
}

/// A merge found by [`find_merge`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge {
    /// Position in `tail` of the absorbing segment
    pub index: usize,
    pub kind: WeaponKind,
    pub tier: u8,
    /// Positions in `tail` of the segments consumed
    pub absorbed: Vec<usize>,
}

/// First merge available in the chain, if any
pub fn find_merge(tail: &[TailSegment]) -> Option<Merge> {
    let live: Vec<usize> = tail
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.expired)
        .map(|(i, _)| i)
        .collect();

    for (n, &i) in live.iter().enumerate() {
        let head = &tail[i];

        if let (Some(&j), Some(&k)) = (live.get(n + 1), live.get(n + 2)) {
            if let Some(kind) = evolution([head.weapon, tail[j].weapon, tail[k].weapon]) {
                let tier = head.tier.min(tail[j].tier).min(tail[k].tier).max(1);
                return Some(Merge {
                    index: i,
                    kind,
                    tier,
                    absorbed: vec![j, k],
                });
            }
        }

        let Some(&j) = live.get(n + 1) else {
            break;
        };
        let next = &tail[j];
        if head.weapon == next.weapon {
            if head.tier == next.tier && head.tier < MAX_TIER {
                return Some(Merge {
                    index: i,
                    kind: head.weapon,
                    tier: head.tier + 1,
                    absorbed: vec![j],
                });
            }
        } else if let Some(kind) = synergy(head.weapon, next.weapon) {
            return Some(Merge {
                index: i,
                kind,
                tier: head.tier.min(next.tier).max(1),
                absorbed: vec![j],
            });
        }
    }
    None
}

/// Apply a merge to the chain. Returns the absorbing segment's id.
pub fn apply_merge(tail: &mut [TailSegment], merge: &Merge) -> Option<u32> {
    let absorber = tail.get_mut(merge.index)?;
    absorber.weapon = merge.kind;
    absorber.element = merge.kind.element();
    absorber.tier = merge.tier.clamp(1, MAX_TIER);
    absorber.fire_timer = 0.0;
    let id = absorber.id;
    for &i in &merge.absorbed {
        if let Some(segment) = tail.get_mut(i) {
            segment.expired = true;
        }
    }
    Some(id)
}

/// Find and apply at most one merge
pub fn merge_once(tail: &mut [TailSegment]) -> Option<(u32, Merge)> {
    let merge = find_merge(tail)?;
    let id = apply_merge(tail, &merge)?;
    Some((id, merge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn chain(spec: &[(WeaponKind, u8)]) -> Vec<TailSegment> {
        spec.iter()
            .enumerate()
            .map(|(i, &(weapon, tier))| TailSegment::new(i as u32 + 10, Vec2::ZERO, weapon, tier))
            .collect()
    }

    fn live(tail: &[TailSegment]) -> Vec<(WeaponKind, u8)> {
        tail.iter().filter(|s| !s.expired).map(|s| (s.weapon, s.tier)).collect()
    }

    #[test]
    fn test_synergy_either_order() {
        for pair in [
            [WeaponKind::MagicWand, WeaponKind::Lightning],
            [WeaponKind::Lightning, WeaponKind::MagicWand],
        ] {
            let mut tail = chain(&[(pair[0], 1), (pair[1], 1)]);
            let (id, _) = merge_once(&mut tail).expect("synergy");
            assert_eq!(id, 10);
            assert_eq!(live(&tail), vec![(WeaponKind::StormStaff, 1)]);
        }
    }

    #[test]
    fn test_three_of_a_kind_promotes_once() {
        let mut tail = chain(&[(WeaponKind::Axe, 1), (WeaponKind::Axe, 1), (WeaponKind::Axe, 1)]);
        merge_once(&mut tail).expect("promotion");
        assert_eq!(live(&tail), vec![(WeaponKind::Axe, 2), (WeaponKind::Axe, 1)]);
        // The remainder has a different tier; nothing more to do
        let mut live_tail: Vec<_> = tail.into_iter().filter(|s| !s.expired).collect();
        assert!(merge_once(&mut live_tail).is_none());
    }

    #[test]
    fn test_max_tier_pair_stays() {
        let tail = chain(&[(WeaponKind::Knife, 3), (WeaponKind::Knife, 3)]);
        assert!(find_merge(&tail).is_none());
    }

    #[test]
    fn test_evolution_is_ordered_and_beats_pairs() {
        let mut tail = chain(&[
            (WeaponKind::Flamethrower, 2),
            (WeaponKind::Laser, 1),
            (WeaponKind::Lightning, 3),
        ]);
        let (_, merge) = merge_once(&mut tail).expect("evolution");
        assert_eq!(merge.absorbed, vec![1, 2]);
        assert_eq!(live(&tail), vec![(WeaponKind::Sunbeam, 1)]);

        let reversed = chain(&[
            (WeaponKind::Lightning, 1),
            (WeaponKind::Laser, 1),
            (WeaponKind::Flamethrower, 1),
        ]);
        assert!(find_merge(&reversed).is_none());
    }

    #[test]
    fn test_expired_segments_are_skipped() {
        let mut tail = chain(&[(WeaponKind::Garlic, 1), (WeaponKind::Axe, 1), (WeaponKind::Tornado, 1)]);
        tail[1].expired = true;
        let (_, merge) = merge_once(&mut tail).expect("adjacent after expiry");
        assert_eq!(merge.kind, WeaponKind::Miasma);
        assert_eq!(merge.absorbed, vec![2]);
    }

    #[test]
    fn test_unrelated_pair_is_a_no_op() {
        let tail = chain(&[(WeaponKind::Mine, 1), (WeaponKind::Shotgun, 1)]);
        assert!(find_merge(&tail).is_none());
    }
}
