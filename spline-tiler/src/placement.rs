//! Decides which part occupies each arc-length slot along the path.

use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256Plus;

use crate::{FreeCoordinate, LENGTH_EPSILON, Placement, SourcePart};

/// Upper bound on slots per pass. Guarantees termination even when a
/// misconfigured part list would otherwise tile a long path with very short
/// parts forever.
pub(crate) const MAX_SLOTS: usize = 1000;

/// Result of the placement stage: the ordered part choice for every slot, plus
/// the stretch factor that maps the occupied length onto the path length.
#[derive(Clone, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct Placements {
    /// Indices into the source-part array, one per slot, in path order.
    pub slots: Vec<usize>,
    /// Sum of the arc lengths of the final slot choices, before stretching.
    pub total_length: FreeCoordinate,
    /// Uniform scale applied to all placed parts; 1 unless stretch-to-fit is on
    /// and the occupied length does not already match the path length.
    pub scale: FreeCoordinate,
}

impl Placements {
    pub(crate) fn empty() -> Self {
        Self {
            slots: Vec::new(),
            total_length: 0.0,
            scale: 1.0,
        }
    }
}

/// Runs both placement passes.
///
/// Pass 1 walks a cursor from distance 0, choosing each slot's part by priority:
/// forward-sequence part pinned to this slot, else the first random part whose
/// fresh draw succeeds, else the first part placed [`Placement::None`], else
/// part 0. Pass 2 overwrites slots with backward-anchored sequence parts counted
/// from the path's end, leaving forward-pinned slots alone.
///
/// The random stream is re-seeded from `seed` every call, so the result is a
/// pure function of its arguments.
pub(crate) fn select_placements(
    parts: &[SourcePart],
    path_length: FreeCoordinate,
    seed: u64,
    stretch_to_fit: bool,
) -> Placements {
    if parts.is_empty() {
        return Placements::empty();
    }

    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let mut slots: Vec<usize> = Vec::new();
    let mut cursor: FreeCoordinate = 0.0;

    while slots.len() < MAX_SLOTS {
        let index = choose_part(parts, slots.len(), &mut rng);
        let length = parts[index].arc_length();
        if cursor + length > path_length + LENGTH_EPSILON {
            break;
        }
        slots.push(index);
        cursor += length;
    }
    if slots.len() == MAX_SLOTS {
        log::warn!("placement stopped at the {MAX_SLOTS}-slot cap before filling the path");
    }

    // Backward-anchored sequence parts count from the final slot; forward pins win.
    let total_slots = slots.len();
    for (position, slot) in slots.iter_mut().enumerate() {
        if parts[*slot].placement().forward_index().is_some() {
            continue;
        }
        let from_end = total_slots - 1 - position;
        if let Some(backward) = parts
            .iter()
            .position(|part| part.placement().backward_index() == Some(from_end))
        {
            *slot = backward;
        }
    }

    let total_length: FreeCoordinate = slots.iter().map(|&slot| parts[slot].arc_length()).sum();
    let scale = if stretch_to_fit
        && total_length > LENGTH_EPSILON
        && (total_length - path_length).abs() > LENGTH_EPSILON
    {
        path_length / total_length
    } else {
        1.0
    };

    Placements {
        slots,
        total_length,
        scale,
    }
}

fn choose_part(parts: &[SourcePart], slot_index: usize, rng: &mut Xoshiro256Plus) -> usize {
    if let Some(index) = parts
        .iter()
        .position(|part| part.placement().forward_index() == Some(slot_index))
    {
        return index;
    }
    for (index, part) in parts.iter().enumerate() {
        if let Placement::Random(probability) = part.placement() {
            if rng.random::<FreeCoordinate>() <= probability {
                return index;
            }
        }
    }
    parts
        .iter()
        .position(|part| matches!(part.placement(), Placement::None))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::source_part;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_filler_fills_exactly() {
        // Path length 10, one 5-long part: the cursor reaches 5 then 10, both in
        // bounds, and the third copy would overrun.
        let parts = [source_part(5.0, Placement::None)];
        let placements = select_placements(&parts, 10.0, 0, false);
        assert_eq!(placements.slots, vec![0, 0]);
        assert_eq!(placements.total_length, 10.0);
        assert_eq!(placements.scale, 1.0);
    }

    #[test]
    fn forward_sequence_pins_first_slot() {
        let parts = [
            source_part(3.0, Placement::Sequence(0.0)),
            source_part(4.0, Placement::None),
        ];
        let placements = select_placements(&parts, 10.0, 0, false);
        assert_eq!(placements.slots, vec![0, 1]);
        assert_eq!(placements.total_length, 7.0);
    }

    #[test]
    fn backward_sequence_overwrites_the_last_slot() {
        let parts = [
            source_part(2.0, Placement::None),
            source_part(2.0, Placement::Sequence(-0.0)),
        ];
        let placements = select_placements(&parts, 10.0, 0, false);
        assert_eq!(placements.slots, vec![0, 0, 0, 0, 1]);
    }

    #[test]
    fn backward_does_not_displace_forward_pin() {
        // Slot 1 is both the forward pin of part 1 and the backward target of
        // part 2 (2 slots total, index -0 → last slot). Forward wins.
        let parts = [
            source_part(5.0, Placement::None),
            source_part(5.0, Placement::Sequence(1.0)),
            source_part(5.0, Placement::Sequence(-0.0)),
        ];
        let placements = select_placements(&parts, 10.0, 0, false);
        assert_eq!(placements.slots, vec![0, 1]);
    }

    #[test]
    fn random_draws_are_deterministic_per_seed() {
        let parts = [
            source_part(1.0, Placement::Random(0.5)),
            source_part(1.0, Placement::None),
        ];
        let a = select_placements(&parts, 20.0, 77, false);
        let b = select_placements(&parts, 20.0, 77, false);
        assert_eq!(a, b);
        // Both choices should occur over 20 slots at probability 0.5.
        assert!(a.slots.contains(&0));
        assert!(a.slots.contains(&1));
    }

    #[test]
    fn random_probability_one_always_wins() {
        let parts = [
            source_part(1.0, Placement::None),
            source_part(1.0, Placement::Random(1.0)),
        ];
        let placements = select_placements(&parts, 5.0, 3, false);
        assert_eq!(placements.slots, vec![1; 5]);
    }

    #[test]
    fn stretch_scale_matches_path_length() {
        let parts = [source_part(3.0, Placement::None)];
        let placements = select_placements(&parts, 10.0, 0, true);
        assert_eq!(placements.slots.len(), 3);
        assert_eq!(placements.total_length, 9.0);
        assert!((placements.total_length * placements.scale - 10.0).abs() < 1e-9);
    }

    #[test]
    fn no_stretch_when_length_already_matches() {
        let parts = [source_part(5.0, Placement::None)];
        let placements = select_placements(&parts, 10.0, 0, true);
        assert_eq!(placements.scale, 1.0);
    }

    #[test]
    fn slot_cap_bounds_degenerate_configurations() {
        let parts = [source_part(0.001, Placement::None)];
        let placements = select_placements(&parts, 1e9, 0, false);
        assert_eq!(placements.slots.len(), MAX_SLOTS);
    }

    #[test]
    fn empty_part_list_produces_no_slots() {
        let placements = select_placements(&[], 10.0, 0, false);
        assert_eq!(placements, Placements::empty());
    }
}
