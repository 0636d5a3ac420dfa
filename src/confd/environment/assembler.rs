//! Derives filesystem search paths from a checked-out working tree plus
//! `(application, profile, label)`. Deliberately thin: the property-file
//! reader that consumes these paths lives in the sibling `materialise`
//! module.

use std::path::{Path, PathBuf};

pub struct EnvironmentAssembler;

impl EnvironmentAssembler {
    /// Most-specific-first: `{app}/{profile}`, `{app}`, `{profile}`,
    /// then the working directory itself. Only directories that exist
    /// are returned; duplicates (e.g. `profile == application`) are kept
    /// once, in their highest-priority position.
    pub fn search_locations(
        working_directory: &Path,
        application: &str,
        profile: &str,
        _label: &str,
    ) -> Vec<PathBuf> {
        let profiles = split_profiles(profile);

        let mut candidates = Vec::new();
        for profile in &profiles {
            candidates.push(working_directory.join(application).join(profile));
        }
        candidates.push(working_directory.join(application));
        for profile in &profiles {
            candidates.push(working_directory.join(profile));
        }
        candidates.push(working_directory.to_path_buf());

        let mut seen = std::collections::HashSet::new();
        candidates
            .into_iter()
            .filter(|p| p.is_dir())
            .filter(|p| seen.insert(p.clone()))
            .collect()
    }
}

fn split_profiles(profile: &str) -> Vec<String> {
    let profiles: Vec<String> = profile
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if profiles.is_empty() {
        vec!["default".to_string()]
    } else {
        profiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn prefers_app_and_profile_over_bare_app() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("myapp/dev")).unwrap();
        std::fs::create_dir_all(dir.path().join("myapp")).unwrap();

        let paths = EnvironmentAssembler::search_locations(dir.path(), "myapp", "dev", "main");
        assert_eq!(paths[0], dir.path().join("myapp/dev"));
        assert_eq!(paths[1], dir.path().join("myapp"));
    }

    #[test]
    fn falls_back_to_working_directory() {
        let dir = tempdir().unwrap();
        let paths = EnvironmentAssembler::search_locations(dir.path(), "myapp", "default", "main");
        assert_eq!(paths, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn defaults_to_default_profile_when_blank() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("default")).unwrap();
        let paths = EnvironmentAssembler::search_locations(dir.path(), "myapp", "", "main");
        assert!(paths.contains(&dir.path().join("default")));
    }
}
