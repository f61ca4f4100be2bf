//! `mingle assign` — read a roster, group it per topic, write the matrix.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use mingle_core::allocate::Allocation;
use mingle_core::config::{ConfigLayer, Settings, resolve_settings};
use mingle_core::model::{OverlapPolicy, UserRecord};
use mingle_core::roster::load_roster;
use mingle_core::shuffle::seeded_rng;
use mingle_core::sink::write_assignments;
use mingle_core::topics::run_topics;
use serde::Serialize;
use tracing::{debug, warn};

use crate::output::{OutputRequest, pretty_kv, pretty_section, render_mode};

/// Arguments for `mingle assign`.
#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Roster CSV with a header row; `id` is required, `department` and
    /// `level` drive the overlap policies.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Destination CSV for the topic × group matrix (overwritten).
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Number of people per group.
    #[arg(short = 'g', long = "group", value_name = "SIZE", value_parser = clap::value_parser!(u64).range(1..))]
    pub group_size: Option<u64>,

    /// Number of topics (grouping rounds).
    #[arg(short = 't', long, value_name = "COUNT", value_parser = clap::value_parser!(u64).range(1..))]
    pub topics: Option<u64>,

    /// Keep people who shared a group in the previous topic apart.
    #[arg(short = 'o', long)]
    pub overlap: bool,

    /// Department policy: prefer-same (alias max) or prefer-different (alias min).
    #[arg(short = 'd', long, value_name = "POLICY")]
    pub department: Option<OverlapPolicy>,

    /// Level policy: prefer-same (alias max) or prefer-different (alias min).
    #[arg(short = 'l', long, value_name = "POLICY")]
    pub level: Option<OverlapPolicy>,

    /// Seed the shuffle for a reproducible run.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Read defaults from this file instead of ./mingle.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl AssignArgs {
    /// Flags given on the command line, as the highest-priority config layer.
    fn flag_layer(&self) -> Result<ConfigLayer> {
        let group_size = self
            .group_size
            .map(usize::try_from)
            .transpose()
            .context("group size does not fit in memory on this platform")?;
        let topics = self
            .topics
            .map(usize::try_from)
            .transpose()
            .context("topic count does not fit in memory on this platform")?;

        Ok(ConfigLayer {
            group_size,
            topics,
            avoid_repeat: self.overlap.then_some(true),
            department: self.department,
            level: self.level,
            seed: self.seed,
            output: None,
        })
    }
}

/// Summary of one topic.
#[derive(Debug, Serialize)]
pub struct TopicSummary {
    pub topic: usize,
    pub groups: usize,
    pub smallest: usize,
    pub largest: usize,
    pub forced: usize,
}

impl TopicSummary {
    fn from_allocation(topic: usize, allocation: &Allocation) -> Self {
        let sizes = allocation.groups.iter().map(mingle_core::Group::len);
        Self {
            topic,
            groups: allocation.groups.len(),
            smallest: sizes.clone().min().unwrap_or(0),
            largest: sizes.max().unwrap_or(0),
            forced: allocation.fallback_count(),
        }
    }
}

/// Report payload for `mingle assign`.
#[derive(Debug, Serialize)]
pub struct AssignSummary {
    pub input: String,
    pub output: String,
    pub records: usize,
    pub group_size: usize,
    pub avoid_repeat: bool,
    pub department: OverlapPolicy,
    pub level: OverlapPolicy,
    pub seed: Option<u64>,
    pub topics: Vec<TopicSummary>,
}

impl AssignSummary {
    fn new(args: &AssignArgs, settings: &Settings, records: usize, topics: &[Allocation]) -> Self {
        Self {
            input: args.input.display().to_string(),
            output: args.output.display().to_string(),
            records,
            group_size: settings.group_size,
            avoid_repeat: settings.avoid_repeat,
            department: settings.department,
            level: settings.level,
            seed: settings.seed,
            topics: topics
                .iter()
                .enumerate()
                .map(|(i, allocation)| TopicSummary::from_allocation(i + 1, allocation))
                .collect(),
        }
    }
}

/// Execute `mingle assign`.
pub fn run_assign(args: &AssignArgs, request: OutputRequest, project_root: &Path) -> Result<()> {
    let settings = resolve_settings(project_root, args.config.as_deref(), &args.flag_layer()?)
        .context("invalid configuration")?;
    debug!(?settings, "settings resolved");

    let roster = load_roster(&args.input)?;
    if roster.is_empty() {
        warn!(path = %args.input.display(), "roster has no usable rows");
    }

    let mut rng = seeded_rng(settings.seed);
    let topics = run_topics(&roster, &settings.topic_plan(), &mut rng);
    log_groups(&roster, &topics);

    write_assignments(&args.output, &roster, &topics)?;

    if request.quiet {
        return Ok(());
    }

    let summary = AssignSummary::new(args, &settings, roster.len(), &topics);
    render_mode(
        request.resolve(settings.output.as_deref()),
        &summary,
        render_summary_text,
        render_summary_pretty,
    )
}

/// Dump every group at debug level as `id,department,level` tuples.
fn log_groups(roster: &[UserRecord], topics: &[Allocation]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    for (t, allocation) in topics.iter().enumerate() {
        for (g, group) in allocation.groups.iter().enumerate() {
            let members: Vec<String> = group
                .records(roster)
                .map(|r| format!("{},{},{}", r.id, r.department, r.level))
                .collect();
            debug!(topic = t + 1, group = g + 1, ?members, "group");
        }
    }
}

fn render_summary_text(summary: &AssignSummary, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "topic\tgroups\tsmallest\tlargest\tforced")?;
    for topic in &summary.topics {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            topic.topic, topic.groups, topic.smallest, topic.largest, topic.forced
        )?;
    }
    Ok(())
}

fn render_summary_pretty(summary: &AssignSummary, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Assignment")?;
    pretty_kv(w, "input", &summary.input)?;
    pretty_kv(w, "output", &summary.output)?;
    pretty_kv(w, "records", summary.records.to_string())?;
    pretty_kv(w, "group size", summary.group_size.to_string())?;
    pretty_kv(w, "no repeats", if summary.avoid_repeat { "yes" } else { "no" })?;
    pretty_kv(w, "department", summary.department.as_str())?;
    pretty_kv(w, "level", summary.level.as_str())?;
    if let Some(seed) = summary.seed {
        pretty_kv(w, "seed", seed.to_string())?;
    }
    writeln!(w)?;

    pretty_section(w, "Topics")?;
    for topic in &summary.topics {
        let forced = match topic.forced {
            0 => String::new(),
            1 => ", 1 forced placement".to_string(),
            n => format!(", {n} forced placements"),
        };
        writeln!(
            w,
            "topic {:<3} {} groups of {}-{}{forced}",
            topic.topic, topic.groups, topic.smallest, topic.largest
        )?;
    }
    Ok(())
}
