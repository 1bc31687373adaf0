//! Configuration file parsing for mutation testing

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::codegen::{check_function, parse_file};
use crate::error::MutationError;
use crate::generator::Generator;
use crate::operator::OperatorRegistry;
use crate::operators;

/// Top-level configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub settings: Settings,
    pub targets: Vec<TargetConfig>,
}

/// Global settings for mutation testing
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Timeout in seconds for each test run
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Stop at the first mutant the tests do not catch
    #[serde(default)]
    pub fail_fast: bool,
    /// Operators to apply, in order
    #[serde(default = "default_operators")]
    pub operators: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            fail_fast: false,
            operators: default_operators(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_operators() -> Vec<String> {
    operators::BUILTIN.iter().map(|s| s.to_string()).collect()
}

impl Settings {
    /// Build the operator registry named by `operators`
    pub fn registry(&self) -> Result<OperatorRegistry, MutationError> {
        OperatorRegistry::from_names(&self.operators)
    }
}

/// A file to mutate
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    /// Path to the Rust source file, relative to the project directory
    pub file: PathBuf,
    /// Restrict mutations to this function
    #[serde(default)]
    pub function: Option<String>,
}

impl TargetConfig {
    /// Create a description for this target
    pub fn description(&self) -> String {
        match &self.function {
            Some(function) => format!("{}::{}", self.file.display(), function),
            None => self.file.display().to_string(),
        }
    }

    pub fn generator<'r>(&self, registry: &'r OperatorRegistry) -> Generator<'r> {
        match &self.function {
            Some(function) => Generator::new(registry).within_function(function.clone()),
            None => Generator::new(registry),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, MutationError> {
        let content = std::fs::read_to_string(path).map_err(|e| MutationError::ConfigError {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| MutationError::ConfigError {
                message: format!("Failed to parse config file '{}': {}", path.display(), e),
            })?;

        Ok(config)
    }

    /// Validate the operators and every target
    pub fn validate(&self, project_dir: &Path) -> Result<(), Vec<MutationError>> {
        let mut errors = Vec::new();

        let registry = match self.settings.registry() {
            Ok(registry) => Some(registry),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        for target in &self.targets {
            if let Err(e) = validate_target(target, project_dir, registry.as_ref()) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Check that a target's file exists, parses, and contains its function
pub fn validate_target(
    target: &TargetConfig,
    project_dir: &Path,
    registry: Option<&OperatorRegistry>,
) -> Result<(), MutationError> {
    let file_path = project_dir.join(&target.file);
    if !file_path.exists() {
        return Err(MutationError::FileNotFound {
            file: target.file.clone(),
        });
    }

    let tree = parse_file(&file_path)?;
    let empty = OperatorRegistry::new();
    let generator = target.generator(registry.unwrap_or(&empty));
    check_function(&tree, &generator, &target.file)
}
