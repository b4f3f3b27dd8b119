//! Generator configuration.

use std::ffi::OsString;
use std::path::PathBuf;
use tracing::warn;

/// Directory signatures are written to unless configured otherwise.
pub const DEFAULT_OUTPUT_DIR: &str = "sig/rbsgen";

/// Configuration for a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Directories searched for `.rbs` files, in load order.
    pub sig_paths: Vec<PathBuf>,
    /// Root of the generated signature tree.
    pub output_dir: PathBuf,
    /// Worker threads; `None` lets rayon decide.
    pub jobs: Option<usize>,
    /// Load the bundled core signatures before `sig_paths`.
    pub core: bool,
    /// Enable verbose output.
    pub verbose: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sig_paths: Vec::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            jobs: None,
            core: true,
            verbose: false,
        }
    }
}

impl GeneratorConfig {
    /// Read `RBSGEN_SIG_PATH`, `RBSGEN_OUTPUT_DIR` and `RBSGEN_JOBS`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var_os(key))
    }

    /// Like [`GeneratorConfig::from_env`], with variables taken from `lookup`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let mut config = Self::default();

        if let Some(paths) = lookup("RBSGEN_SIG_PATH") {
            config.sig_paths = std::env::split_paths(&paths)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
        }
        if let Some(dir) = lookup("RBSGEN_OUTPUT_DIR").filter(|dir| !dir.is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(jobs) = lookup("RBSGEN_JOBS") {
            match jobs.to_str().and_then(|s| s.trim().parse::<usize>().ok()) {
                Some(0) | None => warn!("Ignoring invalid RBSGEN_JOBS value {:?}", jobs),
                Some(n) => config.jobs = Some(n),
            }
        }

        config
    }

    pub fn with_sig_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sig_paths.push(path.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn without_core(mut self) -> Self {
        self.core = false;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> GeneratorConfig {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        GeneratorConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]);
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("sig/rbsgen"));
        assert!(config.core);
    }

    #[test]
    fn test_environment_variables() {
        let sig_path = std::env::join_paths(["sig", "vendor/rbs"]).unwrap();
        let config = from_map(&[
            ("RBSGEN_SIG_PATH", sig_path.to_str().unwrap()),
            ("RBSGEN_OUTPUT_DIR", "out"),
            ("RBSGEN_JOBS", "4"),
        ]);
        assert_eq!(config.sig_paths, vec![PathBuf::from("sig"), PathBuf::from("vendor/rbs")]);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.jobs, Some(4));
    }

    #[test]
    fn test_invalid_jobs_are_ignored() {
        assert_eq!(from_map(&[("RBSGEN_JOBS", "many")]).jobs, None);
        assert_eq!(from_map(&[("RBSGEN_JOBS", "0")]).jobs, None);
    }

    #[test]
    fn test_builder() {
        let config = GeneratorConfig::default()
            .with_sig_path("sig")
            .with_output_dir("generated")
            .with_jobs(2)
            .without_core();
        assert_eq!(config.sig_paths, vec![PathBuf::from("sig")]);
        assert_eq!(config.output_dir, PathBuf::from("generated"));
        assert_eq!(config.jobs, Some(2));
        assert!(!config.core);
    }
}
