#![no_main]

use libfuzzer_sys::fuzz_target;
use mingle_core::allocate::{AllocationRules, distribute, group_count};
use mingle_core::model::{Group, OverlapPolicy, UserRecord};

const POLICIES: [OverlapPolicy; 3] = [
    OverlapPolicy::None,
    OverlapPolicy::PreferSame,
    OverlapPolicy::PreferDifferent,
];

// Byte layout: [capacity, department policy, level policy, (department, level)*]
fuzz_target!(|data: &[u8]| {
    let [cap, dep, level, rest @ ..] = data else {
        return;
    };
    let roster: Vec<UserRecord> = rest
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| UserRecord::new(format!("u{i}"), (pair[0] % 4).to_string(), (pair[1] % 3).to_string()))
        .collect();

    let rules = AllocationRules::new(usize::from(*cap % 8) + 1)
        .with_department(POLICIES[usize::from(*dep % 3)])
        .with_level(POLICIES[usize::from(*level % 3)]);

    let order: Vec<usize> = (0..roster.len()).rev().collect();
    let previous = distribute(&roster, &(0..roster.len()).collect::<Vec<_>>(), None, &rules).groups;
    let allocation = distribute(&roster, &order, Some(&previous), &rules);

    assert_eq!(allocation.groups.len(), group_count(roster.len(), rules.capacity));
    assert!(allocation.groups.iter().all(|g| g.len() <= rules.capacity));
    let placed: usize = allocation.groups.iter().map(Group::len).sum();
    assert_eq!(placed, roster.len());
});
