//! The package sweep: three ordered passes over the paired package maps.
//!
//! Each pass returns its first qualifying finding; the overall comparison
//! returns the first non-None pass result. Later passes cap the severity
//! they surface, so a Major detail discovered while sweeping for Minor
//! changes reports as Minor.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use semvet_common::{Report, ResultCode};
use semvet_types::{Package, is_exported, is_public};

use crate::Comparer;

impl Comparer<'_> {
    pub fn compare_packages(&mut self, olders: &[Package], newers: &[Package]) -> Report {
        let older = package_map(olders);
        let newer = package_map(newers);

        let res = self.major_pass(&older, &newer);
        if !res.is_none() {
            return res;
        }
        let res = self.minor_pass(&older, &newer);
        if !res.is_none() {
            return res;
        }
        let res = self.patchlevel_pass(&older, &newer);
        if !res.is_none() {
            return res;
        }
        Report::NONE
    }

    fn major_pass(
        &mut self,
        older: &BTreeMap<&str, &Package>,
        newer: &BTreeMap<&str, &Package>,
    ) -> Report {
        for (&path, pkg) in older {
            if !is_public(path) {
                continue;
            }
            trace!(package = path, "major pass");
            let Some(new_pkg) = newer.get(path) else {
                return Report::from(ResultCode::Major)
                    .wrap(format!("no new version of package {path}"));
            };

            if let (Some(old_mod), Some(new_mod)) = (&pkg.module, &new_pkg.module) {
                if old_mod.path != new_mod.path {
                    return Report::from(ResultCode::Major).wrap(format!(
                        "module path changed from {} to {}",
                        old_mod.path, new_mod.path
                    ));
                }
                if let (Some(old_v), Some(new_v)) = (&old_mod.go_version, &new_mod.go_version) {
                    if go_version_less(old_v, new_v) {
                        return Report::from(ResultCode::Major).wrap(format!(
                            "minimum Go version changed from {old_v} to {new_v}"
                        ));
                    }
                }
            }

            for (name, &obj) in &pkg.objects {
                if !is_exported(name) {
                    continue;
                }
                let Some(&new_obj) = new_pkg.objects.get(name) else {
                    return Report::from(ResultCode::Major)
                        .wrap(format!("no object {name} in new version of package {path}"));
                };
                let res = self.compare_types(obj, new_obj);
                if res.code() == ResultCode::Major {
                    return res.wrap(format!("checking {name}"));
                }
            }
        }
        Report::NONE
    }

    fn minor_pass(
        &mut self,
        older: &BTreeMap<&str, &Package>,
        newer: &BTreeMap<&str, &Package>,
    ) -> Report {
        for (&path, pkg) in newer {
            if !is_public(path) {
                continue;
            }
            trace!(package = path, "minor pass");
            let old_pkg = older.get(path);

            for (name, &obj) in &pkg.objects {
                if !is_exported(name) {
                    continue;
                }
                let Some(old_pkg) = old_pkg else {
                    return Report::from(ResultCode::Minor)
                        .wrap(format!("no old version of package {path}"));
                };
                let Some(&old_obj) = old_pkg.objects.get(name) else {
                    return Report::from(ResultCode::Minor)
                        .wrap(format!("no object {name} in old version of package {path}"));
                };
                let res = self.compare_types(old_obj, obj);
                if res.code() >= ResultCode::Minor {
                    return res.sub(ResultCode::Minor).wrap(format!("checking {name}"));
                }
            }
        }
        Report::NONE
    }

    /// Unlike the earlier passes, this one walks every package and every
    /// object, exported or not.
    fn patchlevel_pass(
        &mut self,
        older: &BTreeMap<&str, &Package>,
        newer: &BTreeMap<&str, &Package>,
    ) -> Report {
        for (&path, pkg) in older {
            trace!(package = path, "patchlevel pass");
            let Some(new_pkg) = newer.get(path) else {
                return Report::from(ResultCode::Patchlevel)
                    .wrap(format!("no new version of package {path}"));
            };
            for (name, &obj) in &pkg.objects {
                let Some(&new_obj) = new_pkg.objects.get(name) else {
                    return Report::from(ResultCode::Patchlevel)
                        .wrap(format!("no object {name} in new version of package {path}"));
                };
                let res = self.compare_types(obj, new_obj);
                if !res.is_none() {
                    return res
                        .sub(ResultCode::Patchlevel)
                        .wrap(format!("checking {name}"));
                }
            }
        }
        Report::NONE
    }
}

fn package_map<'p>(pkgs: &'p [Package]) -> BTreeMap<&'p str, &'p Package> {
    pkgs.iter().map(|p| (p.path.as_str(), p)).collect()
}

/// Compare two minimum toolchain versions the way the source ecosystem
/// does: lenient two-component versions, missing components are zero.
fn go_version_less(a: &str, b: &str) -> bool {
    match (parse_go_version(a), parse_go_version(b)) {
        (Some(va), Some(vb)) => va < vb,
        _ => {
            debug!(older = a, newer = b, "unparseable Go version; skipping check");
            false
        }
    }
}

fn parse_go_version(v: &str) -> Option<semver::Version> {
    let v = v.strip_prefix('v').unwrap_or(v);
    let mut parts = v.splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    // Release candidates and the like are not versions we order against.
    let patch = parts.next().unwrap_or("0").parse().ok()?;
    Some(semver::Version::new(major, minor, patch))
}
