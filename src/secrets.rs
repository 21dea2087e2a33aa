use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{LoaderError, Result};
use crate::settings::{SecretBackend, Settings};

pub trait SecretProvider: Send + Sync {
    fn get_secret(&self, name: &str) -> Result<String>;
}

/// Reads `sql-database` from `BUDGET_SQL_DATABASE`, and so on.
#[derive(Debug, Clone)]
pub struct EnvSecrets {
    prefix: String,
}

impl Default for EnvSecrets {
    fn default() -> Self {
        Self {
            prefix: "BUDGET_".to_string(),
        }
    }
}

impl EnvSecrets {
    pub fn var_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name.to_uppercase().replace('-', "_"))
    }
}

impl SecretProvider for EnvSecrets {
    fn get_secret(&self, name: &str) -> Result<String> {
        let var = self.var_name(name);
        std::env::var(&var)
            .map_err(|_| LoaderError::Secret(format!("{name} is not set (expected ${var})")))
    }
}

#[cfg(feature = "keyring")]
#[derive(Debug, Clone)]
pub struct KeyringSecrets {
    service: String,
}

#[cfg(feature = "keyring")]
impl KeyringSecrets {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }
}

#[cfg(feature = "keyring")]
impl SecretProvider for KeyringSecrets {
    fn get_secret(&self, name: &str) -> Result<String> {
        keyring::Entry::new(&self.service, name)
            .and_then(|entry| entry.get_password())
            .map_err(|e| LoaderError::Secret(format!("{name}: {e}")))
    }
}

pub fn from_settings(settings: &Settings) -> Result<Box<dyn SecretProvider>> {
    match settings.secret_backend {
        SecretBackend::Env => Ok(Box::new(EnvSecrets::default())),
        #[cfg(feature = "keyring")]
        SecretBackend::Keyring => Ok(Box::new(KeyringSecrets::new(&settings.keyring_service))),
        #[cfg(not(feature = "keyring"))]
        SecretBackend::Keyring => Err(LoaderError::Settings(
            "secret_backend is \"keyring\" but this build has no keyring support".to_string(),
        )),
    }
}

/// Where the sink lives and how to unlock it.
#[derive(Clone)]
pub struct ConnectionParams {
    pub database: PathBuf,
    pub key: Option<String>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("database", &self.database)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The database secret is required; the password secret is optional.
pub fn connection_params(
    secrets: &dyn SecretProvider,
    database_secret: &str,
    password_secret: &str,
) -> Result<ConnectionParams> {
    let database = secrets
        .get_secret(database_secret)
        .map_err(|e| LoaderError::SinkConnectivity(e.to_string()))?;
    let key = match secrets.get_secret(password_secret) {
        Ok(k) if !k.is_empty() => Some(k),
        Ok(_) => None,
        Err(e) => {
            debug!("no database key: {e}");
            None
        }
    };
    Ok(ConnectionParams {
        database: PathBuf::from(database),
        key,
    })
}
