use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use file_sync::SourceSpec;
use serde::Deserialize;

/// Default location of the sync configuration, relative to the working tree.
pub const DEFAULT_CONFIG_PATH: &str = ".github/file-sync.yml";

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    /// Write files that are not present locally yet.
    #[serde(default = "default_true")]
    pub create_missing: bool,
    /// Stop at the first failed file and exit nonzero when anything fails.
    #[serde(default)]
    pub fail_on_error: bool,
}

/// One source as written in the file. Tokens are never stored inline; a
/// source names the environment variable that holds its token instead.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    #[serde(flatten)]
    pub spec: SourceSpec,
    pub token_env: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Supported on-disk formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// Parse configuration text.
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<AppConfig> {
    let config = match format {
        ConfigFormat::Yaml => serde_yaml_ng::from_str(contents).context("invalid YAML")?,
        ConfigFormat::Toml => toml::from_str(contents).context("invalid TOML")?,
    };
    Ok(config)
}

/// Read and parse the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;

    parse_config(&contents, ConfigFormat::from_path(path))
        .with_context(|| format!("failed to parse config at {}", path.display()))
}

/// Resolve the config path against the working tree unless it is absolute.
pub fn resolve_config_path(root: &Path, config: &Path) -> PathBuf {
    if config.is_absolute() {
        config.to_path_buf()
    } else {
        root.join(config)
    }
}

impl AppConfig {
    /// Source specs with per-source tokens read from the environment.
    /// `lookup` is `std::env::var` outside of tests.
    pub fn source_specs(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<SourceSpec>> {
        self.sources
            .iter()
            .map(|entry| {
                let mut spec = entry.spec.clone();
                if let Some(var) = &entry.token_env {
                    match lookup(var) {
                        Some(token) if !token.is_empty() => spec.credential = Some(token),
                        _ => bail!(
                            "source {} expects a token in ${var}, but it is not set",
                            spec.repository
                        ),
                    }
                }
                Ok(spec)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
fail_on_error: true
sources:
  - repository: octo-org/templates
    ref: v2
    files:
      - .github/ISSUE_TEMPLATE/*.md
    paths:
      - local: .github/workflows/ci.yml
        remote: workflows/rust.yml
  - repository: octo-org/private-policies
    token_env: POLICIES_TOKEN
    files:
      - SECURITY.md
"#;

    #[test]
    fn parse_yaml_config() {
        let config = parse_config(YAML, ConfigFormat::Yaml).unwrap();

        assert!(config.fail_on_error);
        assert!(config.create_missing);
        assert_eq!(config.sources.len(), 2);

        let first = &config.sources[0].spec;
        assert_eq!(first.repository, "octo-org/templates");
        assert_eq!(first.git_ref.as_deref(), Some("v2"));
        assert_eq!(first.identity_files, vec![".github/ISSUE_TEMPLATE/*.md"]);
        assert_eq!(
            first.path_pairs[0].remote_path.as_deref(),
            Some("workflows/rust.yml")
        );
        assert_eq!(config.sources[1].token_env.as_deref(), Some("POLICIES_TOKEN"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
create_missing = false

[[sources]]
repository = "octo-org/templates"
files = ["LICENSE"]

[[sources.paths]]
local = "docs/CONTRIBUTING.md"
"#;
        let config = parse_config(toml_str, ConfigFormat::Toml).unwrap();

        assert!(!config.create_missing);
        assert!(!config.fail_on_error);
        let spec = &config.sources[0].spec;
        assert_eq!(spec.identity_files, vec!["LICENSE"]);
        assert_eq!(spec.path_pairs[0].local_path, "docs/CONTRIBUTING.md");
        assert_eq!(spec.path_pairs[0].remote_path, None);
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("sync.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("sync.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("sync.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("sync")), ConfigFormat::Yaml);
    }

    #[test]
    fn token_env_becomes_source_credential() {
        let config = parse_config(YAML, ConfigFormat::Yaml).unwrap();
        let specs = config
            .source_specs(|var| (var == "POLICIES_TOKEN").then(|| "tok".to_owned()))
            .unwrap();

        assert_eq!(specs[0].credential, None);
        assert_eq!(specs[1].credential.as_deref(), Some("tok"));
    }

    #[test]
    fn missing_token_env_is_an_error() {
        let config = parse_config(YAML, ConfigFormat::Yaml).unwrap();
        let err = config.source_specs(|_| None).unwrap_err();
        assert!(err.to_string().contains("POLICIES_TOKEN"));
    }

    #[test]
    fn load_config_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.yml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn load_config_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file-sync.yml");
        std::fs::write(&path, YAML).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn relative_config_path_is_resolved_against_root() {
        let root = Path::new("/work/repo");
        assert_eq!(
            resolve_config_path(root, Path::new(DEFAULT_CONFIG_PATH)),
            PathBuf::from("/work/repo/.github/file-sync.yml")
        );
        assert_eq!(
            resolve_config_path(root, Path::new("/etc/sync.yml")),
            PathBuf::from("/etc/sync.yml")
        );
    }
}
