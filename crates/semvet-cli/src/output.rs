//! Result presentation and exit-code mapping.

use std::io::Write;

use semvet_common::{Report, ResultCode};

use crate::options::parse_version;

pub const EXIT_ERROR: i32 = 4;

/// Whether the version-number change from `v1` to `v2` is adequate for the
/// detected result code. Both versions must have been normalized already.
pub fn version_adequate(code: ResultCode, v1: &str, v2: &str) -> bool {
    let (Some(a), Some(b)) = (parse_version(v1), parse_version(v2)) else {
        return false;
    };
    match code {
        ResultCode::None => a <= b,
        ResultCode::Patchlevel => a < b,
        ResultCode::Minor => (a.major, a.minor) < (b.major, b.minor),
        ResultCode::Major => a.major < b.major,
    }
}

pub struct Presentation {
    pub quiet: bool,
    pub pretty: bool,
    pub v1: Option<String>,
    pub v2: Option<String>,
}

/// Print the result and choose the process exit code.
pub fn show_result(w: &mut impl Write, report: &Report, opts: &Presentation) -> i32 {
    if let (Some(v1), Some(v2)) = (&opts.v1, &opts.v2) {
        let ok = version_adequate(report.code(), v1, v2);
        if !opts.quiet {
            let verdict = if ok { "OK" } else { "ERR" };
            let _ = writeln!(w, "{verdict} using versions {v1} and {v2}: {report}");
        }
        return if ok { 0 } else { 1 };
    }

    if opts.quiet {
        return report.code() as i32;
    }

    if opts.pretty {
        let _ = report.pretty(w);
    } else {
        let _ = writeln!(w, "{report}");
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(report: &Report, quiet: bool, pretty: bool, versions: Option<(&str, &str)>) -> (i32, String) {
        let opts = Presentation {
            quiet,
            pretty,
            v1: versions.map(|(a, _)| a.to_owned()),
            v2: versions.map(|(_, b)| b.to_owned()),
        };
        let mut buf = Vec::new();
        let code = show_result(&mut buf, report, &opts);
        (code, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn quiet_exit_codes_mirror_result_codes() {
        for (code, want) in [
            (ResultCode::None, 0),
            (ResultCode::Patchlevel, 1),
            (ResultCode::Minor, 2),
            (ResultCode::Major, 3),
        ] {
            let (exit, out) = present(&Report::from(code), true, false, None);
            assert_eq!(exit, want);
            assert!(out.is_empty());
        }
    }

    #[test]
    fn plain_output_is_the_display_form() {
        let report = Report::from(ResultCode::Minor).wrap("struct field B was added");
        let (exit, out) = present(&report, false, false, None);
        assert_eq!(exit, 0);
        assert_eq!(out, "struct field B was added: Minor\n");
    }

    #[test]
    fn pretty_output_is_indented() {
        let report = Report::from(ResultCode::Minor).wrap("inner").wrap("outer");
        let (_, out) = present(&report, false, true, None);
        assert_eq!(out, "outer\n  inner\n    Minor\n");
    }

    #[test]
    fn adequacy_matrix() {
        use ResultCode::*;
        let cases = [
            (None, "v1.0.0", "v1.0.0", true),
            (None, "v1.0.1", "v1.0.0", false),
            (Patchlevel, "v1.0.0", "v1.0.1", true),
            (Patchlevel, "v1.0.0", "v1.0.0", false),
            (Minor, "v1.0.0", "v1.1.0", true),
            (Minor, "v1.0.0", "v1.0.9", false),
            (Minor, "v1.2.0", "v2.0.0", true),
            (Major, "v1.9.9", "v2.0.0", true),
            (Major, "v1.0.0", "v1.9.0", false),
        ];
        for (code, v1, v2, want) in cases {
            assert_eq!(
                version_adequate(code, v1, v2),
                want,
                "{code:?} {v1} -> {v2}"
            );
        }
    }

    #[test]
    fn adequacy_check_prints_verdict() {
        let report = Report::from(ResultCode::Minor);
        let (exit, out) = present(&report, false, false, Some(("v1.0.0", "v1.1.0")));
        assert_eq!(exit, 0);
        assert!(out.starts_with("OK using versions v1.0.0 and v1.1.0"), "{out}");

        let (exit, out) = present(&report, false, false, Some(("v1.0.0", "v1.0.1")));
        assert_eq!(exit, 1);
        assert!(out.starts_with("ERR"), "{out}");
    }

    #[test]
    fn quiet_adequacy_prints_nothing() {
        let report = Report::from(ResultCode::Major);
        let (exit, out) = present(&report, true, false, Some(("v1.0.0", "v1.1.0")));
        assert_eq!(exit, 1);
        assert!(out.is_empty());
    }
}
