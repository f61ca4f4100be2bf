//! Greedy group allocator for a single topic.
//!
//! # Algorithm
//!
//! 1. Create `ceil(n / capacity)` empty groups.
//! 2. Build a [`PairHistory`] from the previous topic's groups, if any.
//! 3. Visit records in processing order. For each one, take the **first**
//!    group (lowest index) that
//!    - is not full,
//!    - holds none of the record's previous groupmates,
//!    - passes the department policy, and
//!    - passes the level policy.
//! 4. If no group qualifies, place the record in the **last** group (highest
//!    index) that still has room, ignoring every soft constraint. Scanning the
//!    fallback in reverse keeps forced overflow away from group 0.
//!
//! Attribute sets are tracked per group and only for the duration of one call.
//! The allocator is a single-pass heuristic: it always terminates with full
//! coverage, but makes no claim of optimality.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{Group, OverlapPolicy, UserRecord};
use crate::shuffle::shuffle_order;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Capacity and overlap policies applied to one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRules {
    /// Maximum members per group. Must be at least 1.
    pub capacity: usize,
    pub department: OverlapPolicy,
    pub level: OverlapPolicy,
}

impl AllocationRules {
    /// Rules with the given capacity and no attribute policies.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            department: OverlapPolicy::None,
            level: OverlapPolicy::None,
        }
    }

    #[must_use]
    pub const fn with_department(mut self, policy: OverlapPolicy) -> Self {
        self.department = policy;
        self
    }

    #[must_use]
    pub const fn with_level(mut self, policy: OverlapPolicy) -> Self {
        self.level = policy;
        self
    }
}

/// Where a single record landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Roster position of the record.
    pub record: usize,
    /// Zero-based group index.
    pub group: usize,
    /// `true` when no group satisfied the soft constraints and the record was
    /// placed by the reverse-order fallback.
    pub forced: bool,
}

/// Result of allocating one topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    pub groups: Vec<Group>,
    /// Every placement, in processing order.
    pub placements: Vec<Placement>,
}

impl Allocation {
    /// Number of records placed by the fallback.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.placements.iter().filter(|p| p.forced).count()
    }

    /// Zero-based group index holding `record`, if any.
    #[must_use]
    pub fn group_of(&self, record: usize) -> Option<usize> {
        self.groups.iter().position(|group| group.contains(record))
    }
}

/// For each record, the records it shared a group with in the previous topic.
///
/// Only one topic of history is kept; older pairings are forgotten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairHistory {
    mates: HashMap<usize, HashSet<usize>>,
}

impl PairHistory {
    /// Build the history from a topic's groups. A record is never its own mate.
    #[must_use]
    pub fn from_groups(groups: &[Group]) -> Self {
        let mut mates: HashMap<usize, HashSet<usize>> = HashMap::new();
        for group in groups {
            for &member in group.members() {
                let entry = mates.entry(member).or_default();
                entry.extend(group.members().iter().copied().filter(|&m| m != member));
            }
        }
        Self { mates }
    }

    /// Previous groupmates of `record` (empty when it has none).
    pub fn mates_of(&self, record: usize) -> impl Iterator<Item = usize> + '_ {
        self.mates.get(&record).into_iter().flatten().copied()
    }

    /// Returns `true` if `a` and `b` were in the same group last topic.
    #[must_use]
    pub fn were_grouped(&self, a: usize, b: usize) -> bool {
        self.mates.get(&a).is_some_and(|set| set.contains(&b))
    }

    fn clashes_with(&self, record: usize, group: &Group) -> bool {
        self.mates
            .get(&record)
            .is_some_and(|set| group.members().iter().any(|m| set.contains(m)))
    }
}

// ---------------------------------------------------------------------------
// Per-round group state
// ---------------------------------------------------------------------------

/// A group under construction plus the attribute values already inside it.
#[derive(Debug, Default)]
struct GroupSlot<'a> {
    group: Group,
    departments: HashSet<&'a str>,
    levels: HashSet<&'a str>,
}

impl<'a> GroupSlot<'a> {
    fn is_full(&self, capacity: usize) -> bool {
        self.group.len() >= capacity
    }

    fn admits(&self, idx: usize, record: &UserRecord, history: &PairHistory, rules: &AllocationRules) -> bool {
        !self.is_full(rules.capacity)
            && !history.clashes_with(idx, &self.group)
            && policy_admits(rules.department, &self.departments, record.department_value())
            && policy_admits(rules.level, &self.levels, record.level_value())
    }

    fn place(&mut self, idx: usize, record: &'a UserRecord, rules: &AllocationRules) {
        self.group.push(idx);
        if !rules.department.is_none()
            && let Some(value) = record.department_value()
        {
            self.departments.insert(value);
        }
        if !rules.level.is_none()
            && let Some(value) = record.level_value()
        {
            self.levels.insert(value);
        }
    }
}

fn policy_admits(policy: OverlapPolicy, seen: &HashSet<&str>, value: Option<&str>) -> bool {
    if seen.is_empty() {
        return true;
    }
    let Some(value) = value else {
        return true;
    };
    match policy {
        OverlapPolicy::None => true,
        OverlapPolicy::PreferSame => seen.contains(value),
        OverlapPolicy::PreferDifferent => !seen.contains(value),
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Number of groups needed for `len` records at `capacity` per group.
#[must_use]
pub const fn group_count(len: usize, capacity: usize) -> usize {
    len.div_ceil(capacity)
}

/// Shuffle the roster into a fresh processing order, then [`distribute`] it.
///
/// # Panics
///
/// Panics if `rules.capacity == 0`.
pub fn allocate<R: Rng + ?Sized>(
    roster: &[UserRecord],
    previous: Option<&[Group]>,
    rules: &AllocationRules,
    rng: &mut R,
) -> Allocation {
    let order = shuffle_order(roster.len(), rng);
    distribute(roster, &order, previous, rules)
}

/// Filter `order` down to in-range roster positions, each kept once at its
/// first occurrence.
fn visit_order(roster_len: usize, order: &[usize]) -> Vec<usize> {
    let mut seen = vec![false; roster_len];
    let mut visit = Vec::with_capacity(order.len().min(roster_len));
    for &idx in order {
        match seen.get_mut(idx) {
            Some(flag) if !*flag => {
                *flag = true;
                visit.push(idx);
            }
            Some(_) => debug!(position = idx, "processing order repeats a record; skipping"),
            None => warn!(position = idx, "processing order references a record outside the roster"),
        }
    }
    visit
}

/// Place records into groups, visiting them in `order`.
///
/// `order` holds roster positions and should be a permutation of
/// `0..roster.len()`. Positions outside the roster and repeats of an earlier
/// position are dropped before any group is sized, so the group count follows
/// the records actually visited. `previous` is the prior topic's groups over
/// the same roster.
///
/// Deterministic for a given `order`.
///
/// # Panics
///
/// Panics if `rules.capacity == 0`.
#[must_use]
pub fn distribute(
    roster: &[UserRecord],
    order: &[usize],
    previous: Option<&[Group]>,
    rules: &AllocationRules,
) -> Allocation {
    assert!(rules.capacity >= 1, "group capacity must be at least 1");

    let visit = visit_order(roster.len(), order);
    let history = previous.map(PairHistory::from_groups).unwrap_or_default();
    let mut slots: Vec<GroupSlot<'_>> = (0..group_count(visit.len(), rules.capacity))
        .map(|_| GroupSlot::default())
        .collect();
    let mut placements = Vec::with_capacity(visit.len());

    for idx in visit {
        let record = &roster[idx];

        let target = slots
            .iter()
            .position(|slot| slot.admits(idx, record, &history, rules))
            .map(|group| (group, false))
            .or_else(|| {
                slots
                    .iter()
                    .rposition(|slot| !slot.is_full(rules.capacity))
                    .map(|group| (group, true))
            });

        let Some((group, forced)) = target else {
            warn!(record = %record.id, "every group is full; record left unassigned");
            continue;
        };

        if forced {
            debug!(
                record = %record.id,
                group = group + 1,
                "no group satisfies the soft constraints, falling back"
            );
        }

        slots[group].place(idx, record, rules);
        placements.push(Placement {
            record: idx,
            group,
            forced,
        });
    }

    let allocation = Allocation {
        groups: slots.into_iter().map(|slot| slot.group).collect(),
        placements,
    };
    debug!(
        groups = allocation.groups.len(),
        forced = allocation.fallback_count(),
        "topic allocated"
    );
    allocation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(rows: &[(&str, &str, &str)]) -> Vec<UserRecord> {
        rows
            .iter()
            .map(|(id, dep, level)| UserRecord::new(*id, *dep, *level))
            .collect()
    }

    fn plain(n: usize) -> Vec<UserRecord> {
        (0..n)
            .map(|i| UserRecord::new(format!("u{i}"), "", ""))
            .collect()
    }

    fn identity(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    fn members(allocation: &Allocation) -> Vec<Vec<usize>> {
        allocation
            .groups
            .iter()
            .map(|g| g.members().to_vec())
            .collect()
    }

    #[test]
    fn six_records_fill_two_groups_of_three() {
        let people = plain(6);
        let allocation = distribute(&people, &identity(6), None, &AllocationRules::new(3));
        assert_eq!(members(&allocation), vec![vec![0, 1, 2], vec![3, 4, 5]]);
        assert_eq!(allocation.fallback_count(), 0);
    }

    #[test]
    fn empty_roster_gives_no_groups() {
        let allocation = distribute(&[], &[], None, &AllocationRules::new(4));
        assert!(allocation.groups.is_empty());
        assert!(allocation.placements.is_empty());
    }

    #[test]
    fn last_group_may_be_short() {
        let people = plain(7);
        let allocation = distribute(&people, &identity(7), None, &AllocationRules::new(3));
        let sizes: Vec<usize> = allocation.groups.iter().map(Group::len).collect();
        assert_eq!(sizes, [3, 3, 1]);
    }

    #[test]
    fn capacity_larger_than_roster_gives_one_group() {
        let people = plain(3);
        let allocation = distribute(&people, &identity(3), None, &AllocationRules::new(10));
        assert_eq!(members(&allocation), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn processing_order_drives_first_fit() {
        let people = plain(4);
        let allocation = distribute(&people, &[3, 1, 0, 2], None, &AllocationRules::new(2));
        assert_eq!(members(&allocation), vec![vec![3, 1], vec![0, 2]]);
    }

    #[test]
    #[should_panic(expected = "group capacity must be at least 1")]
    fn zero_capacity_panics() {
        let people = plain(2);
        let _ = distribute(&people, &identity(2), None, &AllocationRules::new(0));
    }

    #[test]
    fn previous_pairs_are_split_when_possible() {
        let people = plain(4);
        let previous = vec![Group::from(vec![0, 1]), Group::from(vec![2, 3])];
        let allocation = distribute(
            &people,
            &identity(4),
            Some(&previous),
            &AllocationRules::new(2),
        );
        assert_eq!(members(&allocation), vec![vec![0, 2], vec![1, 3]]);
        assert_eq!(allocation.fallback_count(), 0);
    }

    #[test]
    fn fallback_scans_groups_in_reverse() {
        let people = plain(5);
        let previous = vec![Group::from(vec![0, 1, 2, 3, 4])];
        let allocation = distribute(
            &people,
            &identity(5),
            Some(&previous),
            &AllocationRules::new(2),
        );
        assert_eq!(members(&allocation), vec![vec![0], vec![1, 4], vec![2, 3]]);
        let forced: Vec<usize> = allocation
            .placements
            .iter()
            .filter(|p| p.forced)
            .map(|p| p.record)
            .collect();
        assert_eq!(forced, [3, 4]);
    }

    #[test]
    fn prefer_different_with_single_department_forces_fallback() {
        let people = roster(&[
            ("a", "Eng", ""),
            ("b", "Eng", ""),
            ("c", "Eng", ""),
            ("d", "Eng", ""),
        ]);
        let rules = AllocationRules::new(2).with_department(OverlapPolicy::PreferDifferent);
        let allocation = distribute(&people, &identity(4), None, &rules);

        assert_eq!(members(&allocation), vec![vec![0, 3], vec![1, 2]]);
        assert_eq!(allocation.fallback_count(), 2);
    }

    #[test]
    fn prefer_same_clusters_departments() {
        let people = roster(&[
            ("a", "Eng", ""),
            ("b", "Ops", ""),
            ("c", "Eng", ""),
            ("d", "Ops", ""),
        ]);
        let rules = AllocationRules::new(2).with_department(OverlapPolicy::PreferSame);
        let allocation = distribute(&people, &identity(4), None, &rules);

        assert_eq!(members(&allocation), vec![vec![0, 2], vec![1, 3]]);
        assert_eq!(allocation.fallback_count(), 0);
    }

    #[test]
    fn prefer_different_mixes_departments() {
        let people = roster(&[
            ("a", "Eng", ""),
            ("b", "Eng", ""),
            ("c", "Ops", ""),
            ("d", "Ops", ""),
        ]);
        let rules = AllocationRules::new(2).with_department(OverlapPolicy::PreferDifferent);
        let allocation = distribute(&people, &identity(4), None, &rules);

        assert_eq!(members(&allocation), vec![vec![0, 2], vec![1, 3]]);
        assert_eq!(allocation.fallback_count(), 0);
    }

    #[test]
    fn blank_attribute_never_blocks_and_is_not_recorded() {
        let people = roster(&[("a", "Eng", ""), ("b", "", ""), ("c", "Ops", ""), ("d", "Eng", "")]);
        let rules = AllocationRules::new(3).with_department(OverlapPolicy::PreferSame);
        let allocation = distribute(&people, &identity(4), None, &rules);

        // b joins a's group; c is rejected there (Ops not present) and opens
        // group 2; d rejoins the Eng group.
        assert_eq!(members(&allocation), vec![vec![0, 1, 3], vec![2]]);
    }

    #[test]
    fn department_and_level_apply_together() {
        let people = roster(&[
            ("a", "Eng", "L1"),
            ("b", "Eng", "L2"),
            ("c", "Ops", "L1"),
            ("d", "Ops", "L2"),
        ]);
        let rules = AllocationRules::new(2)
            .with_department(OverlapPolicy::PreferDifferent)
            .with_level(OverlapPolicy::PreferDifferent);
        let allocation = distribute(&people, &identity(4), None, &rules);

        // c differs from a in department but not level, so only d can join a.
        assert_eq!(members(&allocation), vec![vec![0, 3], vec![1, 2]]);
        assert_eq!(allocation.fallback_count(), 0);
    }

    #[test]
    fn policy_none_ignores_attributes() {
        let people = roster(&[("a", "Eng", "L1"), ("b", "Eng", "L1")]);
        let allocation = distribute(&people, &identity(2), None, &AllocationRules::new(2));
        assert_eq!(members(&allocation), vec![vec![0, 1]]);
    }

    #[test]
    fn out_of_range_positions_are_skipped() {
        let people = plain(2);
        let allocation = distribute(&people, &[0, 9, 1], None, &AllocationRules::new(2));
        let placed: Vec<usize> = allocation.placements.iter().map(|p| p.record).collect();
        assert_eq!(placed, [0, 1]);
        assert_eq!(members(&allocation), vec![vec![0, 1]]);
    }

    #[test]
    fn out_of_range_positions_do_not_add_groups() {
        let people = plain(3);
        let allocation = distribute(&people, &[7, 0, 8, 1, 9, 2], None, &AllocationRules::new(3));
        assert_eq!(allocation.groups.len(), 1);
        assert_eq!(members(&allocation), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn repeated_positions_are_placed_once() {
        let people = plain(2);
        let allocation = distribute(&people, &[0, 0], None, &AllocationRules::new(2));
        assert_eq!(members(&allocation), vec![vec![0]]);
        assert_eq!(allocation.placements.len(), 1);

        let allocation = distribute(&people, &[1, 0, 1, 0], None, &AllocationRules::new(1));
        assert_eq!(members(&allocation), vec![vec![1], vec![0]]);
    }

    #[test]
    fn visit_order_keeps_first_occurrence() {
        assert_eq!(visit_order(4, &[3, 5, 3, 0, 2, 0]), [3, 0, 2]);
        assert!(visit_order(0, &[0, 1]).is_empty());
    }

    #[test]
    fn group_of_finds_member() {
        let people = plain(4);
        let allocation = distribute(&people, &identity(4), None, &AllocationRules::new(2));
        assert_eq!(allocation.group_of(3), Some(1));
        assert_eq!(allocation.group_of(8), None);
    }

    #[test]
    fn pair_history_tracks_groupmates() {
        let history = PairHistory::from_groups(&[Group::from(vec![0, 1, 2]), Group::from(vec![3])]);
        assert!(history.were_grouped(0, 2));
        assert!(history.were_grouped(2, 1));
        assert!(!history.were_grouped(0, 3));
        assert!(!history.were_grouped(0, 0));
        assert_eq!(history.mates_of(3).count(), 0);

        let mut mates: Vec<usize> = history.mates_of(1).collect();
        mates.sort_unstable();
        assert_eq!(mates, [0, 2]);
    }

    #[test]
    fn allocate_covers_roster() {
        let people = plain(10);
        let mut rng = crate::shuffle::seeded_rng(Some(3));
        let allocation = allocate(&people, None, &AllocationRules::new(4), &mut rng);

        let mut placed: Vec<usize> = allocation
            .groups
            .iter()
            .flat_map(|g| g.members().iter().copied())
            .collect();
        placed.sort_unstable();
        assert_eq!(placed, identity(10));
        assert_eq!(allocation.groups.len(), 3);
    }
}
