// Authorization configuration sourced from environment variables and YAML.
use crate::{AuthzError, AuthzResult, Model};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SUPERADMIN_ROLE: &str = "admin";
pub const DEFAULT_ROLES: &str = "admin,user";

/// The closed set of role tags a deployment recognizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCatalog {
    roles: BTreeSet<String>,
}

impl RoleCatalog {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles
                .into_iter()
                .map(Into::into)
                .map(|role: String| role.trim().to_string())
                .filter(|role| !role.is_empty())
                .collect(),
        }
    }

    /// # Errors
    /// - [`AuthzError::UnknownRole`] when `tag` is outside the catalog.
    pub fn validate(&self, tag: &str) -> AuthzResult<()> {
        if self.roles.contains(tag) {
            Ok(())
        } else {
            Err(AuthzError::UnknownRole(tag.to_string()))
        }
    }

    /// Check every role named by a privilege bundle.
    pub fn validate_privilege(&self, privilege: &crate::Privilege) -> AuthzResult<()> {
        for role in &privilege.roles {
            self.validate(role)?;
        }
        Ok(())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.roles.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct AuthzConfig {
    pub superadmin_role: String,
    pub roles: RoleCatalog,
    pub model_path: Option<PathBuf>,
    pub strict_model: bool,
    pub decision_cache_ttl: Option<Duration>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
struct AuthzConfigOverride {
    superadmin_role: Option<String>,
    roles: Option<Vec<String>>,
    model_path: Option<PathBuf>,
    strict_model: Option<bool>,
    decision_cache_ttl_secs: Option<u64>,
}

impl AuthzConfigOverride {
    fn apply(self, config: &mut AuthzConfig) {
        if let Some(value) = self.superadmin_role {
            config.superadmin_role = value;
        }
        if let Some(value) = self.roles {
            config.roles = RoleCatalog::new(value);
        }
        if let Some(value) = self.model_path {
            config.model_path = Some(value);
        }
        if let Some(value) = self.strict_model {
            config.strict_model = value;
        }
        if let Some(value) = self.decision_cache_ttl_secs {
            config.decision_cache_ttl = ttl_from_secs(value);
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn ttl_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            superadmin_role: DEFAULT_SUPERADMIN_ROLE.to_string(),
            roles: RoleCatalog::new(DEFAULT_ROLES.split(',')),
            model_path: None,
            strict_model: false,
            decision_cache_ttl: None,
        }
    }
}

impl AuthzConfig {
    /// Load from `GATEHOUSE_*` environment variables and validate.
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(env_var)?;
        config.check()?;
        Ok(config)
    }

    /// Environment values, then the YAML file named by `GATEHOUSE_CONFIG`.
    ///
    /// Validation runs once on the merged result, so either source may
    /// supply the role catalog for the other's superadmin role.
    pub fn from_env_or_yaml() -> Result<Self> {
        Self::layered(env_var)
    }

    fn layered(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::from_lookup(&lookup)?;
        if let Some(path) = lookup("GATEHOUSE_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read GATEHOUSE_CONFIG: {path}"))?;
            config.merge_yaml(&contents)?;
        }
        config.check()?;
        Ok(config)
    }

    // Parses values without validating the combination.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup("GATEHOUSE_SUPERADMIN_ROLE") {
            config.superadmin_role = value;
        }
        if let Some(value) = lookup("GATEHOUSE_ROLES") {
            config.roles = RoleCatalog::new(value.split(','));
        }
        if let Some(value) = lookup("GATEHOUSE_MODEL_PATH") {
            config.model_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("GATEHOUSE_STRICT_MODEL") {
            config.strict_model = value
                .parse()
                .with_context(|| "parse GATEHOUSE_STRICT_MODEL")?;
        }
        if let Some(value) = lookup("GATEHOUSE_DECISION_CACHE_TTL_SECS") {
            let secs: u64 = value
                .parse()
                .with_context(|| "parse GATEHOUSE_DECISION_CACHE_TTL_SECS")?;
            config.decision_cache_ttl = ttl_from_secs(secs);
        }
        Ok(config)
    }

    /// Apply overrides from a YAML document and re-validate.
    pub fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        self.merge_yaml(contents)?;
        self.check()
    }

    fn merge_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: AuthzConfigOverride = serde_yaml::from_str(contents)
            .with_context(|| "parse authorization config yaml")?;
        override_cfg.apply(self);
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if let Err(err) = self.validate() {
            anyhow::bail!("validate authorization config: {err}");
        }
        Ok(())
    }

    /// # Errors
    /// - [`AuthzError::InvalidConfig`] when the superadmin role is not in the
    ///   role catalog.
    pub fn validate(&self) -> AuthzResult<()> {
        if !self.roles.contains(&self.superadmin_role) {
            return Err(AuthzError::InvalidConfig(format!(
                "superadmin role `{}` is not a configured role",
                self.superadmin_role
            )));
        }
        Ok(())
    }

    /// Load the configured model file, or the built-in RBAC model.
    pub fn load_model(&self) -> AuthzResult<Model> {
        match &self.model_path {
            Some(path) => Model::from_file(path, self.strict_model),
            None => Ok(Model::default_rbac()),
        }
    }
}
