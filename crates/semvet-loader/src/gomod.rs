//! Minimal module-file reading: the module path and the minimum toolchain
//! version are all the comparison needs.

use std::path::Path;

use semvet_types::{LoadError, ModuleInfo};

/// Read `go.mod` at the root of `dir`, if present.
pub fn read_module(dir: &Path) -> Result<Option<ModuleInfo>, LoadError> {
    let path = dir.join("go.mod");
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(LoadError::Io { path, source }),
    };
    Ok(Some(parse_module(&text)))
}

fn parse_module(text: &str) -> ModuleInfo {
    let mut info = ModuleInfo {
        path: String::new(),
        go_version: None,
    };
    for line in text.lines() {
        let line = line.split("//").next().unwrap_or("").trim();
        if let Some(rest) = line.strip_prefix("module ") {
            info.path = rest.trim().trim_matches('"').to_owned();
        } else if let Some(rest) = line.strip_prefix("go ") {
            info.go_version = Some(rest.trim().to_owned());
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::parse_module;

    #[test]
    fn parses_module_and_go_version() {
        let info = parse_module("module example.com/m\n\ngo 1.21\n\nrequire (\n)\n");
        assert_eq!(info.path, "example.com/m");
        assert_eq!(info.go_version.as_deref(), Some("1.21"));
    }

    #[test]
    fn comments_are_stripped() {
        let info = parse_module("module example.com/m // the module\ngo 1.18 // toolchain\n");
        assert_eq!(info.path, "example.com/m");
        assert_eq!(info.go_version.as_deref(), Some("1.18"));
    }

    #[test]
    fn missing_go_directive() {
        let info = parse_module("module example.com/m\n");
        assert_eq!(info.go_version, None);
    }
}
