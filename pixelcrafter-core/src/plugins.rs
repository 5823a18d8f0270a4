//! # Plugins
//!
//! Extensions implement [`Plugin`] and are handed to a [`PluginHost`], which activates them in
//! dependency order and tears them down in reverse.

/// Error a plugin reports from [`Plugin::initialize`].
pub type InitializeError = Box<dyn std::error::Error + Send + Sync>;

pub trait Plugin {
    /// Unique among plugins registered with a host.
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn description(&self) -> &str {
        ""
    }
    fn author(&self) -> &str {
        "Unknown"
    }
    /// Names of plugins that must be active before this one.
    fn dependencies(&self) -> &[String] {
        &[]
    }
    fn initialize(&mut self) -> Result<(), InitializeError>;
    /// Release whatever `initialize` acquired. Called once per successful `initialize`.
    fn cleanup(&mut self);
}

#[derive(thiserror::Error, Debug)]
pub enum PluginError {
    #[error("plugin \"{0}\" is already registered")]
    AlreadyRegistered(String),
    #[error("no plugin named \"{0}\"")]
    Unknown(String),
    #[error("plugin \"{0}\" is not active")]
    NotActive(String),
    #[error("plugin \"{plugin}\" needs \"{dependency}\", which is not active")]
    MissingDependency { plugin: String, dependency: String },
    #[error("plugin \"{plugin}\" is needed by active plugin \"{dependent}\"")]
    InUse { plugin: String, dependent: String },
    #[error("plugin \"{plugin}\" failed to initialize")]
    Initialize {
        plugin: String,
        #[source]
        source: InitializeError,
    },
}

/// Description of a registered plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginInfo<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub description: &'a str,
    pub author: &'a str,
    pub dependencies: &'a [String],
    pub active: bool,
}

#[derive(Default)]
pub struct PluginHost {
    plugins: hashbrown::HashMap<String, Box<dyn Plugin>>,
    /// In activation order.
    active: Vec<String>,
    configs: hashbrown::HashMap<String, serde_json::Map<String, serde_json::Value>>,
}
impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("registered", &self.names())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
impl PluginHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Add an inactive plugin.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), PluginError> {
        let name = plugin.name().to_owned();
        if self.plugins.contains_key(&name) {
            return Err(PluginError::AlreadyRegistered(name));
        }
        log::debug!("Registered plugin \"{name}\" v{}", plugin.version());
        self.plugins.insert(name, plugin);
        Ok(())
    }
    /// Remove a plugin, disabling it first if needed.
    pub fn unregister(&mut self, name: &str) -> Result<Box<dyn Plugin>, PluginError> {
        if self.is_active(name) {
            self.disable(name)?;
        }
        self.configs.remove(name);
        self.plugins
            .remove(name)
            .ok_or_else(|| PluginError::Unknown(name.to_owned()))
    }
    /// Initialize a plugin. Every dependency has to be active already. Enabling an active plugin
    /// does nothing.
    pub fn enable(&mut self, name: &str) -> Result<(), PluginError> {
        let plugin = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::Unknown(name.to_owned()))?;
        if self.active.iter().any(|active| active == name) {
            return Ok(());
        }
        if let Some(missing) = plugin
            .dependencies()
            .iter()
            .find(|dependency| !self.active.contains(*dependency))
        {
            return Err(PluginError::MissingDependency {
                plugin: name.to_owned(),
                dependency: missing.clone(),
            });
        }
        match plugin.initialize() {
            Ok(()) => {
                log::info!("Enabled plugin \"{name}\"");
                self.active.push(name.to_owned());
                Ok(())
            }
            Err(source) => {
                log::error!("Plugin \"{name}\" failed to initialize: {source}");
                Err(PluginError::Initialize {
                    plugin: name.to_owned(),
                    source,
                })
            }
        }
    }
    /// Enable every registered plugin whose dependencies can be met, in dependency order.
    /// Returns the errors of those that could not be enabled.
    pub fn enable_all(&mut self) -> Vec<PluginError> {
        let mut pending: Vec<String> = self
            .names()
            .into_iter()
            .filter(|name| !self.is_active(name))
            .map(str::to_owned)
            .collect();
        let mut failed = Vec::new();
        let mut missing = Vec::new();
        // Keep going while each pass makes progress, dependencies may come later in the list.
        loop {
            let before = pending.len();
            let mut deferred = Vec::new();
            missing.clear();
            for name in pending {
                match self.enable(&name) {
                    Ok(()) => (),
                    Err(err @ PluginError::MissingDependency { .. }) => {
                        missing.push(err);
                        deferred.push(name);
                    }
                    Err(err) => failed.push(err),
                }
            }
            pending = deferred;
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }
        failed.extend(missing);
        failed
    }
    /// Clean up an active plugin. Refused while another active plugin depends on it.
    pub fn disable(&mut self, name: &str) -> Result<(), PluginError> {
        let position = self
            .active
            .iter()
            .position(|active| active == name)
            .ok_or_else(|| PluginError::NotActive(name.to_owned()))?;
        if let Some(dependent) = self.active.iter().find(|active| {
            self.plugins
                .get(active.as_str())
                .is_some_and(|plugin| plugin.dependencies().iter().any(|dep| dep == name))
        }) {
            return Err(PluginError::InUse {
                plugin: name.to_owned(),
                dependent: dependent.clone(),
            });
        }
        self.active.remove(position);
        if let Some(plugin) = self.plugins.get_mut(name) {
            plugin.cleanup();
        }
        log::info!("Disabled plugin \"{name}\"");
        Ok(())
    }
    /// Clean up every active plugin, most recently enabled first.
    pub fn shutdown(&mut self) {
        while let Some(name) = self.active.pop() {
            if let Some(plugin) = self.plugins.get_mut(&name) {
                plugin.cleanup();
                log::debug!("Cleaned up plugin \"{name}\"");
            }
        }
    }
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|active| active == name)
    }
    /// Active plugins in activation order.
    #[must_use]
    pub fn active(&self) -> &[String] {
        &self.active
    }
    /// Registered plugins, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
    #[must_use]
    pub fn info(&self, name: &str) -> Option<PluginInfo<'_>> {
        let plugin = self.plugins.get(name)?;
        Some(PluginInfo {
            name: plugin.name(),
            version: plugin.version(),
            description: plugin.description(),
            author: plugin.author(),
            dependencies: plugin.dependencies(),
            active: self.is_active(name),
        })
    }
    /// Stored settings of a registered plugin. Empty until updated.
    #[must_use]
    pub fn config(&self, name: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.plugins.contains_key(name).then(|| {
            self.configs.get(name).cloned().unwrap_or_default()
        })
    }
    /// Merge `updates` into a plugin's settings, replacing keys that exist.
    pub fn update_config(
        &mut self,
        name: &str,
        updates: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), PluginError> {
        if !self.plugins.contains_key(name) {
            return Err(PluginError::Unknown(name.to_owned()));
        }
        self.configs.entry(name.to_owned()).or_default().extend(updates);
        Ok(())
    }
}
impl Drop for PluginHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}
