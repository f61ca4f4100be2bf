//! Multi-topic orchestration.
//!
//! Topics run strictly in order. When repeat avoidance is on, topic `i` sees
//! the groups produced by topic `i - 1` and nothing older.

use rand::Rng;
use tracing::{info, instrument};

use crate::allocate::{Allocation, AllocationRules, allocate};
use crate::model::UserRecord;

/// Everything needed to run every topic of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicPlan {
    pub topic_count: usize,
    pub rules: AllocationRules,
    /// Keep the previous topic's groupmates apart when possible.
    pub avoid_repeat: bool,
}

/// Allocate every topic in turn, reshuffling the roster for each one.
///
/// Returns one [`Allocation`] per topic, in topic order.
///
/// # Panics
///
/// Panics if `plan.rules.capacity == 0`.
#[instrument(skip_all, fields(records = roster.len(), topics = plan.topic_count))]
pub fn run_topics<R: Rng + ?Sized>(
    roster: &[UserRecord],
    plan: &TopicPlan,
    rng: &mut R,
) -> Vec<Allocation> {
    let mut topics: Vec<Allocation> = Vec::with_capacity(plan.topic_count);

    for topic in 0..plan.topic_count {
        let previous = if plan.avoid_repeat {
            topics.last().map(|prev| prev.groups.as_slice())
        } else {
            None
        };

        let allocation = allocate(roster, previous, &plan.rules, rng);
        info!(
            topic = topic + 1,
            groups = allocation.groups.len(),
            forced = allocation.fallback_count(),
            "topic grouped"
        );
        topics.push(allocation);
    }

    topics
}
