//! The report algebra: severity codes and reason chains.

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// The required version-bump level detected by a comparison.
///
/// The ordering is total: `None < Patchlevel < Minor < Major`, and sibling
/// findings combine by taking the greater code.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    #[default]
    None,
    Patchlevel,
    Minor,
    Major,
}

impl ResultCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::None => "None",
            ResultCode::Patchlevel => "Patchlevel",
            ResultCode::Minor => "Minor",
            ResultCode::Major => "Major",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of a comparison: a `ResultCode` with an optional chain of
/// human-readable reasons, outermost reason first.
///
/// A wrapping never changes the effective code, and wrapping a `None`
/// report is the identity: trivial results carry no reasons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Report {
    Code(ResultCode),
    Wrap {
        code: ResultCode,
        why: String,
        inner: Box<Report>,
    },
}

impl Report {
    pub const NONE: Report = Report::Code(ResultCode::None);

    pub fn code(&self) -> ResultCode {
        match self {
            Report::Code(code) => *code,
            Report::Wrap { code, .. } => *code,
        }
    }

    pub fn is_none(&self) -> bool {
        self.code() == ResultCode::None
    }

    /// Attach a reason to this report. Identity on `None`.
    pub fn wrap(self, why: impl Into<String>) -> Report {
        if self.is_none() {
            return self;
        }
        Report::Wrap {
            code: self.code(),
            why: why.into(),
            inner: Box::new(self),
        }
    }

    /// Downgrade the severity to at most `cap`, preserving the reason chain.
    ///
    /// Used when a later sweep pass surfaces a finding that an earlier pass
    /// was responsible for: the later pass may only report its own level.
    pub fn sub(self, cap: ResultCode) -> Report {
        match self {
            Report::Code(code) => Report::Code(code.min(cap)),
            Report::Wrap { code, why, inner } => Report::Wrap {
                code: code.min(cap),
                why,
                inner: Box::new(inner.sub(cap)),
            },
        }
    }

    /// Combine two sibling findings, keeping the first on ties.
    pub fn worse_of(self, other: Report) -> Report {
        if other.code() > self.code() { other } else { self }
    }

    /// Write the indented multi-line rendering of this report: one reason
    /// per line, two more spaces of indent per nesting level, and the bare
    /// code word on the last line.
    pub fn pretty(&self, w: &mut impl Write) -> io::Result<()> {
        self.pretty_indent(w, 0)
    }

    fn pretty_indent(&self, w: &mut impl Write, depth: usize) -> io::Result<()> {
        match self {
            Report::Code(code) => writeln!(w, "{:indent$}{code}", "", indent = 2 * depth),
            Report::Wrap { why, inner, .. } => {
                writeln!(w, "{:indent$}{why}", "", indent = 2 * depth)?;
                inner.pretty_indent(w, depth + 1)
            }
        }
    }
}

impl From<ResultCode> for Report {
    fn from(code: ResultCode) -> Report {
        Report::Code(code)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Code(code) => code.fmt(f),
            Report::Wrap { why, inner, .. } => write!(f, "{why}: {inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_ordering() {
        assert!(ResultCode::None < ResultCode::Patchlevel);
        assert!(ResultCode::Patchlevel < ResultCode::Minor);
        assert!(ResultCode::Minor < ResultCode::Major);
    }

    #[test]
    fn wrap_preserves_code() {
        let r = Report::from(ResultCode::Major).wrap("field X removed");
        assert_eq!(r.code(), ResultCode::Major);
    }

    #[test]
    fn wrap_on_none_is_identity() {
        let r = Report::NONE.wrap("should not appear");
        assert_eq!(r, Report::NONE);
    }

    #[test]
    fn sub_caps_every_level() {
        let r = Report::from(ResultCode::Major)
            .wrap("inner reason")
            .wrap("outer reason")
            .sub(ResultCode::Minor);
        assert_eq!(r.code(), ResultCode::Minor);
        match &r {
            Report::Wrap { inner, .. } => assert_eq!(inner.code(), ResultCode::Minor),
            Report::Code(_) => panic!("reason chain was dropped"),
        }
    }

    #[test]
    fn sub_is_noop_below_cap() {
        let r = Report::from(ResultCode::Patchlevel).wrap("why");
        assert_eq!(r.clone().sub(ResultCode::Major), r);
    }

    #[test]
    fn worse_of_keeps_first_on_tie() {
        let a = Report::from(ResultCode::Minor).wrap("first");
        let b = Report::from(ResultCode::Minor).wrap("second");
        assert_eq!(a.clone().worse_of(b), a);
    }

    #[test]
    fn worse_of_prefers_greater() {
        let a = Report::from(ResultCode::Patchlevel).wrap("small");
        let b = Report::from(ResultCode::Major).wrap("big");
        assert_eq!(a.worse_of(b.clone()), b);
    }

    #[test]
    fn pretty_bare_code() {
        let mut buf = Vec::new();
        Report::from(ResultCode::Minor).pretty(&mut buf).unwrap();
        assert_eq!(buf, b"Minor\n");
    }

    #[test]
    fn pretty_single_wrap() {
        let mut buf = Vec::new();
        let r = Report::from(ResultCode::Minor).wrap("foo");
        r.pretty(&mut buf).unwrap();
        assert_eq!(buf, b"foo\n  Minor\n");
    }

    #[test]
    fn pretty_nested_wraps() {
        let mut buf = Vec::new();
        let r = Report::from(ResultCode::Major)
            .wrap("inner")
            .wrap("outer");
        r.pretty(&mut buf).unwrap();
        assert_eq!(buf, b"outer\n  inner\n    Major\n");
    }

    #[test]
    fn pretty_is_pure() {
        let r = Report::from(ResultCode::Major).wrap("inner").wrap("outer");
        let mut a = Vec::new();
        let mut b = Vec::new();
        r.pretty(&mut a).unwrap();
        r.clone().pretty(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn display_one_line() {
        let r = Report::from(ResultCode::Major).wrap("inner").wrap("outer");
        assert_eq!(r.to_string(), "outer: inner: Major");
        assert_eq!(Report::from(ResultCode::None).to_string(), "None");
    }

    #[test]
    fn code_serde_text_forms() {
        for (code, want) in [
            (ResultCode::None, "\"None\""),
            (ResultCode::Patchlevel, "\"Patchlevel\""),
            (ResultCode::Minor, "\"Minor\""),
            (ResultCode::Major, "\"Major\""),
        ] {
            assert_eq!(serde_json::to_string(&code).unwrap(), want);
            let back: ResultCode = serde_json::from_str(want).unwrap();
            assert_eq!(back, code);
        }
        assert!(serde_json::from_str::<ResultCode>("\"Gigantic\"").is_err());
    }
}
