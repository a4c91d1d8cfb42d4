//! Factory-driven engine construction.
//!
//! The service binary hands the builder a validated configuration and the
//! factory maps for the pluggable components (storage, notifier); the
//! builder wires everything and produces a ready [`SettlerEngine`]. The
//! payment network clients are constructed directly from their typed
//! configuration section: there is exactly one network, and its
//! credentials are injected explicitly rather than read ambiently.

use crate::event_bus::EventBus;
use crate::state::OrderStore;
use crate::{EngineError, SettlerEngine};
use settler_auth::implementations::daraja::DarajaTokenProvider;
use settler_auth::AuthService;
use settler_config::Config;
use settler_gateway::implementations::card::CardGateway;
use settler_gateway::implementations::daraja::DarajaGateway;
use settler_gateway::{CardGatewayInterface, GatewayService};
use settler_notify::{NotifierFactory, NotifierService};
use settler_settlement::implementations::daraja::DarajaCorrelator;
use settler_settlement::CorrelatorService;
use settler_storage::{StorageFactory, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Factory maps for the pluggable components.
pub struct SettlerFactories {
	/// Storage backend factories by configuration name.
	pub storage: HashMap<String, StorageFactory>,
	/// Notifier factories by configuration name.
	pub notifiers: HashMap<String, NotifierFactory>,
}

/// Builder that assembles a [`SettlerEngine`] from configuration.
pub struct SettlerBuilder {
	config: Config,
	factories: SettlerFactories,
}

impl SettlerBuilder {
	/// Creates a builder for the given configuration and factories.
	pub fn new(config: Config, factories: SettlerFactories) -> Self {
		Self { config, factories }
	}

	/// Builds the engine.
	pub fn build(self) -> Result<SettlerEngine, EngineError> {
		let config = self.config;

		// Storage backend, selected by name from configuration.
		let storage_section = config
			.storage
			.implementations
			.get(&config.storage.primary)
			.ok_or_else(|| {
				EngineError::Config(format!(
					"No configuration for storage implementation '{}'",
					config.storage.primary
				))
			})?;
		let storage_factory = self
			.factories
			.storage
			.get(&config.storage.primary)
			.ok_or_else(|| {
				EngineError::Config(format!(
					"Unknown storage implementation '{}'",
					config.storage.primary
				))
			})?;
		let backend =
			storage_factory(storage_section).map_err(|e| EngineError::Config(e.to_string()))?;
		let storage = Arc::new(StorageService::new(backend));
		let orders = Arc::new(OrderStore::new(storage));

		// Receipt notifier, selected by name from configuration.
		let notifier_section = config
			.notifier
			.implementations
			.get(&config.notifier.primary)
			.ok_or_else(|| {
				EngineError::Config(format!(
					"No configuration for notifier implementation '{}'",
					config.notifier.primary
				))
			})?;
		let notifier_factory = self
			.factories
			.notifiers
			.get(&config.notifier.primary)
			.ok_or_else(|| {
				EngineError::Config(format!(
					"Unknown notifier implementation '{}'",
					config.notifier.primary
				))
			})?;
		let notifier = Arc::new(NotifierService::new(
			notifier_factory(notifier_section).map_err(|e| EngineError::Config(e.to_string()))?,
		));

		// Payment network clients from the typed section.
		let mpesa = &config.mpesa;
		let provider = DarajaTokenProvider::new(
			mpesa.api_url.clone(),
			mpesa.consumer_key.clone(),
			mpesa.consumer_secret.clone(),
			Duration::from_secs(mpesa.token_timeout_secs),
		)
		.map_err(|e| EngineError::Config(e.to_string()))?;
		let auth = Arc::new(AuthService::new(Box::new(provider)));

		let daraja = DarajaGateway::new(
			mpesa.api_url.clone(),
			Duration::from_secs(mpesa.initiation_timeout_secs),
		)
		.map_err(|e| EngineError::Config(e.to_string()))?;
		let gateway = Arc::new(GatewayService::new(Box::new(daraja), mpesa.max_attempts));

		let card: Option<Arc<dyn CardGatewayInterface>> = match &config.card {
			Some(card_config) => Some(Arc::new(
				CardGateway::new(
					card_config.api_url.clone(),
					card_config.secret_key.clone(),
					Duration::from_secs(card_config.timeout_secs),
				)
				.map_err(|e| EngineError::Config(e.to_string()))?,
			)),
			None => None,
		};

		let correlator = Arc::new(CorrelatorService::new(Box::new(DarajaCorrelator::new())));

		let callback_url = format!(
			"{}/api/payments/callback",
			config.settler.base_url.trim_end_matches('/')
		);

		Ok(SettlerEngine::new(
			config,
			orders,
			auth,
			gateway,
			correlator,
			card,
			notifier,
			EventBus::default(),
			callback_url,
		))
	}
}
