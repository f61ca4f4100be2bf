use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// One person on the roster, as read from a CSV row.
///
/// Only `id` is required. The name and email columns are carried through
/// untouched; `department` and `level` feed the overlap policies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub level: String,
}

impl UserRecord {
    /// Build a record with only the fields the allocator looks at.
    #[must_use]
    pub fn new(id: impl Into<String>, department: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            department: department.into(),
            level: level.into(),
        }
    }

    /// Department value, or `None` when blank.
    #[must_use]
    pub fn department_value(&self) -> Option<&str> {
        non_blank(&self.department)
    }

    /// Level value, or `None` when blank.
    #[must_use]
    pub fn level_value(&self) -> Option<&str> {
        non_blank(&self.level)
    }

    /// Returns `true` if every column of the row was empty.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [
            &self.id,
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.department,
            &self.level,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// How strongly a group should lean toward one attribute value.
///
/// `PreferSame` admits a record only if its value is already in the group;
/// `PreferDifferent` only if it is not. Either way an empty group, or a record
/// without a value, always passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    #[default]
    None,
    #[serde(alias = "max", alias = "prefer_same")]
    PreferSame,
    #[serde(alias = "min", alias = "prefer_different")]
    PreferDifferent,
}

impl OverlapPolicy {
    /// Canonical spelling used on the command line and in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PreferSame => "prefer-same",
            Self::PreferDifferent => "prefer-different",
        }
    }

    /// Returns `true` if this policy never constrains placement.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl FromStr for OverlapPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "none" => Ok(Self::None),
            "prefer-same" | "same" | "max" => Ok(Self::PreferSame),
            "prefer-different" | "different" | "min" => Ok(Self::PreferDifferent),
            _ => Err(ParseEnumError {
                expected: "overlap policy (prefer-same|prefer-different|none)",
                got: s.to_string(),
            }),
        }
    }
}

/// A capacity-bounded bucket of roster members within one topic.
///
/// Members are positions in the roster slice the group was built from, in
/// the order they were placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    members: Vec<usize>,
}

impl Group {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Roster positions of the members, in placement order.
    #[must_use]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn contains(&self, record: usize) -> bool {
        self.members.contains(&record)
    }

    pub(crate) fn push(&mut self, record: usize) {
        self.members.push(record);
    }

    /// Resolve members against the roster the group was built from.
    ///
    /// Positions outside the roster are skipped.
    pub fn records<'a>(&'a self, roster: &'a [UserRecord]) -> impl Iterator<Item = &'a UserRecord> + 'a {
        self.members.iter().filter_map(|&idx| roster.get(idx))
    }
}

impl From<Vec<usize>> for Group {
    fn from(members: Vec<usize>) -> Self {
        Self { members }
    }
}
