//! Engine context shared by every activation: configuration, collaborators
//! and the optional execution listener.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::backend::config::{ConfigError, EngineConfig};
use crate::backend::intl::{BuiltinLocaleData, ListFormatInitializer};
use crate::backend::nodes::ExecutionListener;
use crate::backend::pattern::{CachingPatternEngine, PatternEngine, RegexPatternEngine};

pub struct Context {
    config: EngineConfig,
    pattern_engine: Arc<dyn PatternEngine>,
    list_format: ListFormatInitializer,
    listener: RwLock<Option<Arc<dyn ExecutionListener>>>,
}

impl Context {
    /// Build a context from a configuration, validating it first
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Build a context without validating `config`
    pub fn new(config: EngineConfig) -> Self {
        let pattern_engine = Arc::new(CachingPatternEngine::new(
            RegexPatternEngine,
            config.pattern.cache_capacity,
        ));
        let locale_data = BuiltinLocaleData::new(
            &config.intl.default_locale,
            &config.intl.available_locales,
        );
        info!(
            target: "spectree::context",
            strict = config.execution.strict,
            speculation = config.execution.speculation,
            default_locale = %config.intl.default_locale,
            "context created"
        );
        Context {
            pattern_engine,
            list_format: ListFormatInitializer::new(Arc::new(locale_data)),
            listener: RwLock::new(None),
            config,
        }
    }

    /// Replace the pattern engine
    pub fn with_pattern_engine(mut self, engine: Arc<dyn PatternEngine>) -> Self {
        self.pattern_engine = engine;
        self
    }

    /// Replace the list-format initializer
    pub fn with_list_format(mut self, initializer: ListFormatInitializer) -> Self {
        self.list_format = initializer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_strict(&self) -> bool {
        self.config.execution.strict
    }

    pub fn speculation_enabled(&self) -> bool {
        self.config.execution.speculation
    }

    pub fn pattern_engine(&self) -> &Arc<dyn PatternEngine> {
        &self.pattern_engine
    }

    pub fn list_format(&self) -> &ListFormatInitializer {
        &self.list_format
    }

    pub fn listener(&self) -> Option<Arc<dyn ExecutionListener>> {
        self.listener.read().clone()
    }

    pub fn set_listener(&self, listener: Arc<dyn ExecutionListener>) {
        debug!(target: "spectree::context", "execution listener installed");
        *self.listener.write() = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self.listener.write() = None;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("list_format", &self.list_format)
            .field("listener", &self.listener.read().is_some())
            .finish_non_exhaustive()
    }
}
