use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{Error, InternalResult};

/// Input limits applied before an expression is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Longest accepted expression, in bytes.
    #[serde(default = "default_max_expression_length")]
    pub max_expression_length: usize,

    /// Deepest accepted nesting of `(`, `[` and `{`.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,

    /// Tallest accepted syntax tree, checked after parsing.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_expression_length: default_max_expression_length(),
            max_nesting_depth: default_max_nesting_depth(),
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

impl EvaluatorConfig {
    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        Error::config(format!(
            "Failed to parse {}: {}",
            path.as_ref().display(),
            e
        ))
    })
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    serde_json::from_str(s).map_err(|e| Error::config(format!("Failed to parse config: {}", e)))
}

fn default_max_expression_length() -> usize {
    10_000
}

// recursive descent costs stack per bracket level
fn default_max_nesting_depth() -> usize {
    40
}

fn default_max_tree_depth() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: EvaluatorConfig = from_str("{}").unwrap();
        assert_eq!(config, EvaluatorConfig::default());
        assert_eq!(config.max_expression_length, 10_000);
        assert_eq!(config.max_nesting_depth, 40);
        assert_eq!(config.max_tree_depth, 1000);
    }

    #[test]
    fn test_partial_override() {
        let config: EvaluatorConfig = from_str(r#"{"max_nesting_depth": 5}"#).unwrap();
        assert_eq!(config.max_nesting_depth, 5);
        assert_eq!(config.max_expression_length, 10_000);
    }

    #[test]
    fn test_invalid_json() {
        let result: InternalResult<EvaluatorConfig> = from_str("{ not json");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_expression_length": 64}}"#).unwrap();

        let config = EvaluatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_expression_length, 64);
        assert_eq!(config.max_nesting_depth, 40);
    }

    #[test]
    fn test_from_missing_file() {
        let result = EvaluatorConfig::from_file("/nonexistent/evaluator.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
