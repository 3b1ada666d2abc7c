/// `load_config` module: loads the YAML servers file and resolves server IDs into connections.
///
/// This module is the only place where the servers file is parsed and mapped to
/// [`ServerConnection`]s. When the file does not exist, a single server can be
/// described through environment variables instead:
/// `SUPPORT_BUNDLE_URL` plus either `SUPPORT_BUNDLE_ACCESS_TOKEN` or
/// `SUPPORT_BUNDLE_USER` / `SUPPORT_BUNDLE_PASSWORD`.
///
/// ```yaml
/// default: local
/// servers:
///   - id: local
///     url: http://localhost:8082/artifactory
///     access_token: "..."
///   - id: backup
///     url: https://backup.example.com/artifactory
///     user: admin
///     password: "..."
/// ```
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use support_bundle_core::config::{Credentials, ServerConnection};
use support_bundle_core::contract::ConnectionResolver;
use support_bundle_core::error::ResolveError;
use tracing::{error, info};

pub const ENV_URL: &str = "SUPPORT_BUNDLE_URL";
pub const ENV_ACCESS_TOKEN: &str = "SUPPORT_BUNDLE_ACCESS_TOKEN";
pub const ENV_USER: &str = "SUPPORT_BUNDLE_USER";
pub const ENV_PASSWORD: &str = "SUPPORT_BUNDLE_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl ServerEntry {
    fn credentials(&self) -> Result<Credentials, ResolveError> {
        match (&self.access_token, &self.user, &self.password) {
            (Some(token), None, None) => Ok(Credentials::Bearer {
                access_token: token.clone(),
            }),
            (None, Some(user), Some(password)) => Ok(Credentials::Basic {
                user: user.clone(),
                password: password.clone(),
            }),
            (None, None, None) => Ok(Credentials::None),
            _ => Err(ResolveError::Invalid(format!(
                "server '{}' must use either access_token or user/password",
                self.id
            ))),
        }
    }

    fn connection(&self) -> Result<ServerConnection, ResolveError> {
        Ok(ServerConnection::new(self.url.as_str(), self.credentials()?))
    }
}

/// Parsed servers file; resolves server IDs without side effects.
#[derive(Debug, Clone, Deserialize)]
pub struct ServersFile {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

impl ServersFile {
    pub fn parse(content: &str) -> Result<Self> {
        let file: ServersFile = serde_yaml::from_str(content)
            .map_err(|e| anyhow!("Failed to parse servers YAML: {e}"))?;
        file.validate()?;
        Ok(file)
    }

    /// A single `default` server described by environment variables, if any.
    pub fn from_env() -> Option<Self> {
        let url = env::var(ENV_URL).ok()?;
        let entry = ServerEntry {
            id: "default".to_string(),
            url,
            user: env::var(ENV_USER).ok(),
            password: env::var(ENV_PASSWORD).ok(),
            access_token: env::var(ENV_ACCESS_TOKEN).ok(),
        };
        Some(Self {
            default: Some(entry.id.clone()),
            servers: vec![entry],
        })
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for server in &self.servers {
            if !seen.insert(server.id.as_str()) {
                return Err(anyhow!("Duplicate server id '{}' in servers file", server.id));
            }
            server.credentials()?;
        }
        if let Some(default) = &self.default {
            if !seen.contains(default.as_str()) {
                return Err(anyhow!("Default server '{default}' is not defined"));
            }
        }
        Ok(())
    }

    fn find(&self, id: &str) -> Result<&ServerEntry, ResolveError> {
        self.servers
            .iter()
            .find(|server| server.id == id)
            .ok_or_else(|| ResolveError::UnknownServer(id.to_string()))
    }
}

impl ConnectionResolver for ServersFile {
    fn resolve<'a>(&self, server_id: Option<&'a str>) -> Result<ServerConnection, ResolveError> {
        let entry = match server_id.filter(|id| !id.is_empty()) {
            Some(id) => self.find(id)?,
            None => match &self.default {
                Some(default) => self.find(default)?,
                None => self.servers.first().ok_or(ResolveError::NoDefault)?,
            },
        };
        info!(server_id = %entry.id, url = %entry.url, "Resolved server");
        entry.connection()
    }
}

/// Loads the servers file, falling back to environment variables when it is missing.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServersFile> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading servers from file");

    if !path_ref.exists() {
        if let Some(from_env) = ServersFile::from_env() {
            info!(config_path = ?path_ref, "Servers file missing, using environment");
            return Ok(from_env);
        }
    }

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read servers file");
        anyhow!("Failed to read servers file {:?}: {}", path_ref, e)
    })?;
    let servers = ServersFile::parse(&content).map_err(|e| {
        error!(error = %e, config_path = ?path_ref, "Failed to parse servers file");
        e
    })?;
    info!(
        config_path = ?path_ref,
        servers = servers.servers.len(),
        "Parsed servers file successfully"
    );
    Ok(servers)
}
