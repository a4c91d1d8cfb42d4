//! File-based storage backend.
//!
//! Persists each key as a file under a configured directory. Orders are
//! never deleted by the engine, so the layout stays simple: one file per
//! key, written whole on every update.

use crate::{StorageError, StorageFactory, StorageInterface};
use async_trait::async_trait;
use settler_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::path::PathBuf;
use tokio::fs;

/// File-based storage implementation.
pub struct FileStorage {
	storage_path: PathBuf,
}

impl FileStorage {
	/// Creates a FileStorage rooted at the given directory.
	pub fn new(storage_path: PathBuf) -> Self {
		Self { storage_path }
	}

	/// Maps a storage key to a file path. Key characters outside
	/// `[A-Za-z0-9._-]` are replaced so namespaced keys (`orders:id`)
	/// become valid file names.
	fn file_path(&self, key: &str) -> PathBuf {
		let safe: String = key
			.chars()
			.map(|c| {
				if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
					c
				} else {
					'_'
				}
			})
			.collect();
		self.storage_path.join(format!("{}.json", safe))
	}

	async fn ensure_dir(&self) -> Result<(), StorageError> {
		fs::create_dir_all(&self.storage_path)
			.await
			.map_err(|e| StorageError::Backend(format!("Failed to create storage dir: {}", e)))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match fs::read(self.file_path(key)).await {
			Ok(bytes) => Ok(bytes),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.ensure_dir().await?;

		// Write to a temp file first so a crash mid-write never leaves a
		// truncated record behind.
		let path = self.file_path(key);
		let tmp = path.with_extension("json.tmp");
		fs::write(&tmp, &value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&tmp, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.file_path(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(fs::try_exists(self.file_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("path", FieldType::String { non_empty: true })],
			vec![],
		)
		.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `path`: directory for stored records (required)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let path = config
		.get("path")
		.and_then(|v| v.as_str())
		.ok_or_else(|| StorageError::Configuration("Missing 'path'".to_string()))?;

	Ok(Box::new(FileStorage::new(PathBuf::from(path))))
}

/// Registry entry for the file backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl crate::StorageRegistry for Registry {}
