use coretime_account::AccountError;
use coretime_config::ConfigError;
use coretime_core::EngineError;
use coretime_monitor::MonitorError;
use coretime_types::UnknownMode;
use thiserror::Error;

/// Errors that stop the watcher.
#[derive(Debug, Error)]
pub enum ServiceError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	UnknownMode(#[from] UnknownMode),
	#[error("Account error: {0}")]
	Account(#[from] AccountError),
	#[error("Chain error: {0}")]
	Chain(#[from] MonitorError),
	#[error("Engine error: {0}")]
	Engine(#[from] EngineError),
}
