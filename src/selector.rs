//! Weighted random provider selection

use crate::registry::ProviderDescriptor;
use rand::Rng;
use std::collections::HashSet;

/// Pick one provider from `candidates`, skipping anything in `excluded`.
///
/// Candidates are walked in the order given, so with a seeded `rng` the choice is a
/// pure function of `(candidates, excluded, seed)`. Zero-weight providers are only
/// picked, uniformly, once every weighted candidate has been excluded. Disabled
/// providers are never picked. Returns `None` when nothing remains.
pub fn pick<'a, R>(
    candidates: &[&'a ProviderDescriptor],
    excluded: &HashSet<String>,
    rng: &mut R,
) -> Option<&'a ProviderDescriptor>
where
    R: Rng + ?Sized,
{
    let remaining: Vec<&'a ProviderDescriptor> = candidates
        .iter()
        .copied()
        .filter(|d| d.enabled && !excluded.contains(&d.name))
        .collect();

    if remaining.is_empty() {
        return None;
    }

    let total: u64 = remaining.iter().map(|d| u64::from(d.weight)).sum();
    if total == 0 {
        return Some(remaining[rng.gen_range(0..remaining.len())]);
    }

    let draw = rng.gen_range(0..total);
    let mut cumulative = 0u64;
    for descriptor in &remaining {
        cumulative += u64::from(descriptor.weight);
        if cumulative > draw {
            return Some(descriptor);
        }
    }

    // cumulative == total > draw after the last candidate
    remaining.last().copied()
}
