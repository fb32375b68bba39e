//! Nested accumulator of comparison outcomes.
//!
//! A [`Report`] holds the comments recorded at one depth of a traversal and
//! one child report per structured node below it. The report is successful
//! when no failure comment exists anywhere in its subtree.

use std::fmt;

use serde::Serialize;

use deepassert_types::PropertyPath;

/// Classification of a recorded failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    SizeMismatch,
    ExclusiveNull,
    ScalarMismatch,
    MissingOverride,
    ExcessOverride,
    ExcessExpected,
    ExcessActual,
    CrossRoleReference,
    NotDeleted,
    IdMissing,
    Disappeared,
    NeverAsserted,
    CopyFailure,
}

impl FailureKind {
    /// Stable short code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SizeMismatch => "size-mismatch",
            Self::ExclusiveNull => "exclusive-null",
            Self::ScalarMismatch => "scalar-mismatch",
            Self::MissingOverride => "missing-override-for-field",
            Self::ExcessOverride => "excess-unconsumed-override",
            Self::ExcessExpected => "excess-expected",
            Self::ExcessActual => "excess-actual",
            Self::CrossRoleReference => "cross-role-reference",
            Self::NotDeleted => "not-deleted",
            Self::IdMissing => "id-missing",
            Self::Disappeared => "disappeared",
            Self::NeverAsserted => "never-asserted",
            Self::CopyFailure => "copy-failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Pass or fail, with a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success { message: String },
    Failure { kind: FailureKind, message: String },
}

/// One recorded outcome at a path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub path: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Comment {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failure { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            Outcome::Failure { kind, .. } => Some(*kind),
            Outcome::Success { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match &self.outcome {
            Outcome::Success { message } | Outcome::Failure { message, .. } => message,
        }
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Success { message } => write!(f, "ok   {}: {}", self.path, message),
            Outcome::Failure { kind, message } => {
                write!(f, "FAIL {} [{}]: {}", self.path, kind, message)
            }
        }
    }
}

/// Tree of comments and child reports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    name: String,
    comments: Vec<Comment>,
    children: Vec<Report>,
}

impl Report {
    /// An empty report.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The node this report covers, usually a property path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Comments recorded directly on this report, in order.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Nested reports, in the order they were opened.
    pub fn children(&self) -> &[Report] {
        &self.children
    }

    /// Record a passing comparison.
    pub fn success(&mut self, path: &PropertyPath, message: impl Into<String>) {
        self.comments.push(Comment {
            path: path.to_string(),
            outcome: Outcome::Success {
                message: message.into(),
            },
        });
    }

    /// Record a failed comparison.
    pub fn failure(&mut self, path: &PropertyPath, kind: FailureKind, message: impl Into<String>) {
        self.comments.push(Comment {
            path: path.to_string(),
            outcome: Outcome::Failure {
                kind,
                message: message.into(),
            },
        });
    }

    /// Open a child report and return it for writing.
    pub fn child(&mut self, name: impl Into<String>) -> &mut Report {
        self.children.push(Report::new(name));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Attach a finished report as a child.
    pub fn attach(&mut self, child: Report) {
        self.children.push(child);
    }

    /// `true` when no failure is recorded anywhere in the subtree.
    pub fn is_success(&self) -> bool {
        self.comments.iter().all(|c| !c.is_failure())
            && self.children.iter().all(Report::is_success)
    }

    /// All failure comments, depth-first.
    pub fn failures(&self) -> Vec<&Comment> {
        let mut out = Vec::new();
        self.collect(&mut out, &|c: &Comment| c.is_failure());
        out
    }

    /// Number of failures in the subtree.
    pub fn failure_count(&self) -> usize {
        self.failures().len()
    }

    /// Number of comments of any outcome in the subtree.
    pub fn comment_count(&self) -> usize {
        self.comments.len() + self.children.iter().map(Report::comment_count).sum::<usize>()
    }

    /// Failures of one kind, depth-first.
    pub fn failures_of(&self, kind: FailureKind) -> Vec<&Comment> {
        let mut out = Vec::new();
        self.collect(&mut out, &|c: &Comment| c.failure_kind() == Some(kind));
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Comment>, keep: &dyn Fn(&Comment) -> bool) {
        out.extend(self.comments.iter().filter(|c| keep(c)));
        for child in &self.children {
            child.collect(out, keep);
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        writeln!(f, "{indent}{}", self.name)?;
        for comment in self.comments.iter().filter(|c| c.is_failure()) {
            for (i, line) in comment.to_string().lines().enumerate() {
                let pad = if i == 0 { "  " } else { "    " };
                writeln!(f, "{indent}{pad}{line}")?;
            }
        }
        for child in self.children.iter().filter(|c| !c.is_success()) {
            child.render(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Plain indented listing of the failing branches only.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> PropertyPath {
        PropertyPath::parse(raw).unwrap()
    }

    #[test]
    fn empty_report_succeeds() {
        let report = Report::new("root");
        assert!(report.is_success());
        assert_eq!(report.failure_count(), 0);
    }

    #[test]
    fn nested_failure_fails_the_root() {
        let mut report = Report::new("root");
        report.success(&path("Person.id"), "1 == 1");
        report
            .child("Person.address")
            .failure(&path("Person.address.street"), FailureKind::ScalarMismatch, "nope");
        assert!(!report.is_success());
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.comment_count(), 2);
        assert_eq!(report.failures()[0].path, "Person.address.street");
    }

    #[test]
    fn failures_of_filters_by_kind() {
        let mut report = Report::new("root");
        report.failure(&path("a"), FailureKind::ExcessOverride, "x");
        report.failure(&path("b"), FailureKind::SizeMismatch, "y");
        assert_eq!(report.failures_of(FailureKind::SizeMismatch).len(), 1);
        assert_eq!(report.failures_of(FailureKind::IdMissing).len(), 0);
    }

    #[test]
    fn display_lists_only_failing_branches() {
        let mut report = Report::new("Person");
        report.child("Person.ok").success(&path("Person.ok.x"), "fine");
        report
            .child("Person.bad")
            .failure(&path("Person.bad.y"), FailureKind::ScalarMismatch, "expected 1 but was 2");
        let text = report.to_string();
        assert!(text.contains("FAIL Person.bad.y [scalar-mismatch]: expected 1 but was 2"));
        assert!(!text.contains("Person.ok"));
    }

    #[test]
    fn serializes_to_json() {
        let mut report = Report::new("r");
        report.failure(&path("a"), FailureKind::IdMissing, "no id");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["comments"][0]["kind"], "IdMissing");
        assert_eq!(json["comments"][0]["outcome"], "failure");
        assert_eq!(json["comments"][0]["path"], "a");
    }
}
