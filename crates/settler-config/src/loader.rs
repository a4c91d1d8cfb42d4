//! Multi-file configuration loading.
//!
//! Supports `include = [..]` directives so deployments can keep credentials
//! and infrastructure sections in separate files. Each top-level section
//! must be unique across all files; circular includes are rejected.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loader that resolves includes relative to a base directory.
pub struct ConfigLoader {
	base_path: PathBuf,
	loaded_files: HashSet<PathBuf>,
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	/// Creates a loader resolving relative paths against `base_path`.
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads a configuration file and all of its includes.
	pub async fn load_config(&mut self, config_path: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let config_path = self.resolve_path(config_path)?;

		let main_content = self.load_file(&config_path).await?;
		let main_toml: toml::Value = toml::from_str(&main_content)?;

		let includes = self.extract_includes(&main_toml)?;
		if includes.is_empty() {
			return main_content.parse();
		}

		let combined = self
			.combine(main_toml, includes, config_path.clone())
			.await?;
		let combined_str = toml::to_string(&combined)
			.map_err(|e| ConfigError::Parse(format!("Failed to serialize combined config: {}", e)))?;

		// Placeholders were already resolved per file; parse and validate.
		let config: Config = toml::from_str(&combined_str)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads a file, resolving environment placeholders and rejecting
	/// circular includes.
	async fn load_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = path.canonicalize().map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	fn extract_includes(&self, toml: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
		let Some(include_value) = toml.get("include") else {
			return Ok(Vec::new());
		};

		if let Some(array) = include_value.as_array() {
			array
				.iter()
				.map(|item| {
					item.as_str().map(PathBuf::from).ok_or_else(|| {
						ConfigError::Validation(
							"Include array must contain only strings".to_string(),
						)
					})
				})
				.collect()
		} else if let Some(path) = include_value.as_str() {
			Ok(vec![PathBuf::from(path)])
		} else {
			Err(ConfigError::Validation(
				"Include must be a string or array of strings".to_string(),
			))
		}
	}

	/// Merges included files into the main document, rejecting duplicate
	/// top-level sections so two files cannot silently fight over one.
	async fn combine(
		&mut self,
		mut main_toml: toml::Value,
		includes: Vec<PathBuf>,
		main_path: PathBuf,
	) -> Result<toml::Value, ConfigError> {
		if let Some(table) = main_toml.as_table_mut() {
			table.remove("include");
		}

		if let Some(main_table) = main_toml.as_table() {
			for key in main_table.keys() {
				self.section_sources.insert(key.clone(), main_path.clone());
			}
		}

		for include_path in includes {
			let resolved_path = self.resolve_path(&include_path)?;
			let include_content = self.load_file(&resolved_path).await?;
			let include_toml: toml::Value = toml::from_str(&include_content)?;

			if let Some(include_table) = include_toml.as_table() {
				for key in include_table.keys() {
					if let Some(existing) = self.section_sources.get(key) {
						return Err(ConfigError::Validation(format!(
							"Duplicate section '{}' found in {} and {}",
							key,
							existing.display(),
							resolved_path.display()
						)));
					}
					self.section_sources
						.insert(key.clone(), resolved_path.clone());
				}

				if let Some(main_table) = main_toml.as_table_mut() {
					for (key, value) in include_table {
						main_table.insert(key.clone(), value.clone());
					}
				}
			}
		}

		Ok(main_toml)
	}

	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const CORE_SECTIONS: &str = r#"
[mpesa]
consumer_key = "key"
consumer_secret = "secret"
shortcode = "174379"
passkey = "passkey"

[storage]
primary = "memory"
[storage.implementations.memory]

[notifier]
primary = "log"
[notifier.implementations.log]
"#;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");

		let content = format!(
			"[settler]\nid = \"s1\"\nbase_url = \"https://shop.example.com\"\n{}",
			CORE_SECTIONS
		);
		fs::write(&config_path, content).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("config.toml").await.unwrap();
		assert_eq!(config.settler.id, "s1");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();

		let main = "include = [\"payments.toml\"]\n[settler]\nid = \"s1\"\nbase_url = \"https://shop.example.com\"\n";
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();
		fs::write(temp_dir.path().join("payments.toml"), CORE_SECTIONS).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();
		assert_eq!(config.storage.primary, "memory");
	}

	#[tokio::test]
	async fn test_duplicate_section_rejected() {
		let temp_dir = TempDir::new().unwrap();

		let main = format!(
			"include = [\"extra.toml\"]\n[settler]\nid = \"s1\"\nbase_url = \"https://shop.example.com\"\n{}",
			CORE_SECTIONS
		);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();
		fs::write(temp_dir.path().join("extra.toml"), "[settler]\nid = \"s2\"\nbase_url = \"https://x\"\n").unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let result = loader.load_config("main.toml").await;
		assert!(result.unwrap_err().to_string().contains("Duplicate section 'settler'"));
	}

	#[tokio::test]
	async fn test_self_include_rejected() {
		let temp_dir = TempDir::new().unwrap();

		let content = "include = [\"self.toml\"]\n[settler]\nid = \"s1\"\nbase_url = \"https://x\"\n";
		fs::write(temp_dir.path().join("self.toml"), content).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let result = loader.load_config("self.toml").await;
		assert!(result.unwrap_err().to_string().contains("already loaded"));
	}
}
