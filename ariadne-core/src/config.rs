use std::path::Path;

use serde::{Deserialize, Serialize};

use ariadne_graphs::resolver::ResolverConfig;

use crate::error::{ConfigError, Result};

/// Top-level analyzer configuration, matching `ariadne.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub resolver: ResolverSection,
    #[serde(default)]
    pub parser: ParserSection,
    #[serde(default)]
    pub entry_points: EntryPointsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSection {
    /// Candidate cap for method calls whose receiver type is unknown.
    pub polymorphic_expansion_limit: usize,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            polymorphic_expansion_limit: ResolverConfig::default().polymorphic_expansion_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserSection {
    /// Per-file input ceiling of the parser backend, in bytes.
    pub max_file_bytes: usize,
    /// Split oversize files at top-level declaration boundaries instead of
    /// skipping them.
    pub split_oversize_files: bool,
}

impl Default for ParserSection {
    fn default() -> Self {
        Self {
            max_file_bytes: 32 * 1024,
            split_oversize_files: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPointsSection {
    /// Report test functions as entry points. They stay tagged either way.
    pub include_tests: bool,
}

impl Default for EntryPointsSection {
    fn default() -> Self {
        Self {
            include_tests: true,
        }
    }
}

impl AnalyzerConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::NotFound(path.display().to_string()))?;
        Self::from_toml(&text)
    }

    /// Parse from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AnalyzerConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.resolver.polymorphic_expansion_limit == 0 {
            return Err(ConfigError::Invalid(
                "resolver.polymorphic_expansion_limit must be at least 1".to_string(),
            ));
        }
        if self.parser.max_file_bytes == 0 {
            return Err(ConfigError::Invalid(
                "parser.max_file_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            polymorphic_expansion_limit: self.resolver.polymorphic_expansion_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.parser.max_file_bytes, 32 * 1024);
        assert!(config.parser.split_oversize_files);
        assert!(config.entry_points.include_tests);
        assert_eq!(config.resolver.polymorphic_expansion_limit, 12);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = AnalyzerConfig::from_toml(
            "[resolver]\npolymorphic_expansion_limit = 4\n",
        )
        .unwrap();
        assert_eq!(config.resolver.polymorphic_expansion_limit, 4);
        assert_eq!(config.parser.max_file_bytes, 32 * 1024);
    }

    #[test]
    fn zero_limit_rejected() {
        let err = AnalyzerConfig::from_toml(
            "[resolver]\npolymorphic_expansion_limit = 0\n",
        );
        assert!(err.is_err());
    }

    #[test]
    fn bad_toml_rejected() {
        assert!(AnalyzerConfig::from_toml("[[parser").is_err());
    }

    #[test]
    fn load_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ariadne.toml");
        std::fs::write(
            &path,
            "[parser]\nmax_file_bytes = 1024\nsplit_oversize_files = false\n",
        )
        .unwrap();

        let config = AnalyzerConfig::load(&path).unwrap();
        assert_eq!(config.parser.max_file_bytes, 1024);
        assert!(!config.parser.split_oversize_files);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = AnalyzerConfig::load(Path::new("/nonexistent/ariadne.toml"));
        assert!(err.is_err());
    }
}
