//! Plugin registry — resolves `module::class` descriptors into live components.
//!
//! Every loadable factor and strategy is registered under a `module::class`
//! key with a constructor closure. Configuration refers to components by
//! `(module, class)` pairs; nothing is loaded by reflection, so an unknown key
//! is a configuration error reported up front.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{factors, strategies, ComponentError, Factor, Params, Strategy};

/// Module path of the built-in factors.
pub const FACTORS_MODULE: &str = "stockradar.factors";
/// Module path of the built-in strategies.
pub const STRATEGIES_MODULE: &str = "stockradar.strategies";

type FactorCtor =
    Box<dyn Fn(&str, &Params) -> Result<Box<dyn Factor>, ComponentError> + Send + Sync>;
type StrategyCtor =
    Box<dyn Fn(&str, &Params) -> Result<Box<dyn Strategy>, ComponentError> + Send + Sync>;

/// Reference to a loadable component plus its constructor arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    #[serde(rename = "module")]
    pub module_path: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub name: String,
    #[serde(default)]
    pub params: Params,
}

impl PluginDescriptor {
    pub fn new(
        module_path: impl Into<String>,
        class_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            module_path: module_path.into(),
            class_name: class_name.into(),
            name: name.into(),
            params: Params::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Registry key: `module::class`.
    pub fn key(&self) -> String {
        registry_key(&self.module_path, &self.class_name)
    }
}

/// A strategy descriptor with the factors to attach, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    #[serde(flatten)]
    pub plugin: PluginDescriptor,
    #[serde(default)]
    pub factors: Vec<PluginDescriptor>,
}

impl StrategyDescriptor {
    pub fn new(plugin: PluginDescriptor) -> Self {
        Self {
            plugin,
            factors: Vec::new(),
        }
    }

    pub fn with_factor(mut self, factor: PluginDescriptor) -> Self {
        self.factors.push(factor);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Factor,
    Strategy,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKind::Factor => f.write_str("factor"),
            PluginKind::Strategy => f.write_str("strategy"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unknown {kind} plugin '{key}'")]
    Unknown { kind: PluginKind, key: String },
    #[error("failed to construct {kind} '{name}' ({key})")]
    Construction {
        kind: PluginKind,
        key: String,
        name: String,
        #[source]
        source: ComponentError,
    },
}

impl PluginError {
    pub fn kind(&self) -> PluginKind {
        match self {
            PluginError::Unknown { kind, .. } | PluginError::Construction { kind, .. } => *kind,
        }
    }
}

/// Constructor table for factors and strategies.
#[derive(Default)]
pub struct PluginRegistry {
    factors: BTreeMap<String, FactorCtor>,
    strategies: BTreeMap<String, StrategyCtor>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in factor and strategy.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        factors::register_builtins(&mut registry);
        strategies::register_builtins(&mut registry);
        registry
    }

    /// Register (or replace) a factor constructor.
    pub fn register_factor<F>(&mut self, module_path: &str, class_name: &str, ctor: F)
    where
        F: Fn(&str, &Params) -> Result<Box<dyn Factor>, ComponentError> + Send + Sync + 'static,
    {
        self.factors
            .insert(registry_key(module_path, class_name), Box::new(ctor));
    }

    /// Register (or replace) a strategy constructor.
    pub fn register_strategy<F>(&mut self, module_path: &str, class_name: &str, ctor: F)
    where
        F: Fn(&str, &Params) -> Result<Box<dyn Strategy>, ComponentError> + Send + Sync + 'static,
    {
        self.strategies
            .insert(registry_key(module_path, class_name), Box::new(ctor));
    }

    /// Construct a fresh factor instance from `descriptor`.
    pub fn resolve_factor(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<Box<dyn Factor>, PluginError> {
        let key = descriptor.key();
        let ctor = self.factors.get(&key).ok_or_else(|| PluginError::Unknown {
            kind: PluginKind::Factor,
            key: key.clone(),
        })?;
        ctor(&descriptor.name, &descriptor.params).map_err(|source| PluginError::Construction {
            kind: PluginKind::Factor,
            key,
            name: descriptor.name.clone(),
            source,
        })
    }

    /// Construct a fresh strategy instance and attach its factors in order.
    ///
    /// Every call builds new instances; nothing is cached between calls.
    pub fn resolve_strategy(
        &self,
        descriptor: &StrategyDescriptor,
    ) -> Result<Box<dyn Strategy>, PluginError> {
        let plugin = &descriptor.plugin;
        let key = plugin.key();
        let ctor = self.strategies.get(&key).ok_or_else(|| PluginError::Unknown {
            kind: PluginKind::Strategy,
            key: key.clone(),
        })?;
        let mut strategy =
            ctor(&plugin.name, &plugin.params).map_err(|source| PluginError::Construction {
                kind: PluginKind::Strategy,
                key,
                name: plugin.name.clone(),
                source,
            })?;

        for factor in &descriptor.factors {
            strategy.add_factor(self.resolve_factor(factor)?);
        }
        tracing::debug!(
            strategy = %plugin.name,
            factors = ?strategy.required_factors(),
            "strategy resolved"
        );
        Ok(strategy)
    }

    pub fn factor_keys(&self) -> impl Iterator<Item = &str> {
        self.factors.keys().map(String::as_str)
    }

    pub fn strategy_keys(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("factors", &self.factors.keys().collect::<Vec<_>>())
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn registry_key(module_path: &str, class_name: &str) -> String {
    format!("{module_path}::{class_name}")
}
