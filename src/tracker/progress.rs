//! Aggregated progress for one session and its display label.

use crate::tracker::classify::ToolClass;

/// Completion counter a finished call can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Files written, edited, moved or deleted.
    Write,
    /// Files read.
    Read,
    /// Directories listed.
    List,
    /// Searches run.
    Search,
    /// Commands run.
    Command,
    /// Third-party tool calls.
    ExternalTool,
}

impl Bucket {
    /// Label order.
    pub const ALL: [Bucket; 6] = [
        Self::Write,
        Self::Read,
        Self::List,
        Self::Search,
        Self::Command,
        Self::ExternalTool,
    ];

    /// Bucket a class counts towards, if any.
    #[must_use]
    pub fn for_class(class: ToolClass) -> Option<Self> {
        match class {
            ToolClass::Write => Some(Self::Write),
            ToolClass::Read => Some(Self::Read),
            ToolClass::List => Some(Self::List),
            ToolClass::Search => Some(Self::Search),
            ToolClass::Command => Some(Self::Command),
            ToolClass::ExternalTool => Some(Self::ExternalTool),
            ToolClass::Fetch | ToolClass::Think | ToolClass::SwitchMode | ToolClass::Other => None,
        }
    }

    /// `(noun, trailing verb)` of the bucket's phrase.
    fn phrase(self) -> (&'static str, Option<&'static str>) {
        match self {
            Self::Write => ("file", Some("created")),
            Self::Read => ("file", Some("analyzed")),
            Self::List => ("path", Some("listed")),
            Self::Search => ("search", None),
            Self::Command => ("command", None),
            Self::ExternalTool => ("tool call", None),
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Write => 0,
            Self::Read => 1,
            Self::List => 2,
            Self::Search => 3,
            Self::Command => 4,
            Self::ExternalTool => 5,
        }
    }
}

/// Pluralize the last word of `noun` for `count`.
///
/// `count == 1` keeps the singular. `query` is the one irregular word; words
/// ending in `s`, `x`, `ch` or `sh` take `es`; everything else takes `s`.
#[must_use]
pub fn pluralize(noun: &str, count: usize) -> String {
    if count == 1 {
        return noun.to_owned();
    }
    let (head, last) = match noun.rfind(' ') {
        Some(idx) => noun.split_at(idx + 1),
        None => ("", noun),
    };
    let plural = if last == "query" {
        "queries".to_owned()
    } else if ["s", "x", "ch", "sh"].iter().any(|end| last.ends_with(end)) {
        format!("{last}es")
    } else {
        format!("{last}s")
    };
    format!("{head}{plural}")
}

/// Snapshot of session progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    counts: [usize; 6],
    /// Current free-text action label.
    pub action: String,
    /// Calls that ended in `failed`.
    pub failed: usize,
    /// Distinct external-tool calls that completed.
    pub unique_external_calls: usize,
    /// Expected external calls, for the completion ratio.
    pub expected_external_calls: Option<usize>,
}

impl ProgressState {
    /// Initial state with the given action label.
    #[must_use]
    pub fn new(action: &str, expected_external_calls: Option<usize>) -> Self {
        Self {
            action: action.to_owned(),
            expected_external_calls,
            ..Self::default()
        }
    }

    /// Completed calls in `bucket`.
    #[must_use]
    pub fn count(&self, bucket: Bucket) -> usize {
        self.counts[bucket.index()]
    }

    pub(crate) fn increment(&mut self, bucket: Bucket) {
        self.counts[bucket.index()] += 1;
    }

    /// Total completed calls across all buckets.
    #[must_use]
    pub fn total_completed(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Comma-joined non-zero buckets in fixed order, e.g.
    /// `"2 files created, 1 file analyzed, 3 searches"`. Empty when all zero.
    #[must_use]
    pub fn summary(&self) -> String {
        Bucket::ALL
            .iter()
            .filter_map(|&bucket| {
                let count = self.count(bucket);
                (count > 0).then(|| {
                    let (noun, verb) = bucket.phrase();
                    let noun = pluralize(noun, count);
                    match verb {
                        Some(verb) => format!("{count} {noun} {verb}"),
                        None => format!("{count} {noun}"),
                    }
                })
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The line pushed to the display.
    #[must_use]
    pub fn render(&self) -> String {
        let mut line = self.action.clone();
        let summary = self.summary();
        if !summary.is_empty() {
            line.push_str(" · ");
            line.push_str(&summary);
        }
        if let Some(expected) = self.expected_external_calls {
            line.push_str(&format!(
                " ({}/{expected} tools)",
                self.unique_external_calls
            ));
        }
        line
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
