//! Plugin resolution: a static name → function registry standing in for the
//! host-language reflection a dynamically-loaded plugin system would use.
//!
//! Bundled plugins are registered under their bare name (`"default"`); a
//! caller can additionally register `(name, function)` pairs before a run.
//! `module::function`-style names are treated as ordinary registry keys —
//! there is no on-disk module loading here, only lookup.

use std::collections::HashMap;

use crate::error::PluginError;
use crate::stage::{FunctionProvider, KernelFn, Stage};

/// A registered custom kernel: the function a named plugin should run for
/// whichever stage(s) it chooses to act on.
pub type CustomFn = KernelFn;

/// Name → kernel mapping for one plugin kind (iterator, mixer, extractor, or
/// mover).
#[derive(Default)]
struct Registry {
    entries: HashMap<String, CustomFn>,
}

impl Registry {
    fn register(&mut self, name: impl Into<String>, f: CustomFn) {
        self.entries.insert(name.into(), f);
    }

    fn resolve(&self, name: &str, kind: &'static str) -> Result<CustomFn, PluginError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::NotFound { name: name.to_string(), kind })
    }
}

/// Holds every user-registered custom iterator/mixer/extractor/mover,
/// looked up by name at plugin-resolution time (before a run starts).
#[derive(Default)]
pub struct PluginRegistry {
    iterators: Registry,
    mixers: Registry,
    extractors: Registry,
    movers: Registry,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_iterator(&mut self, name: impl Into<String>, f: CustomFn) {
        self.iterators.register(name, f);
    }

    pub fn register_mixer(&mut self, name: impl Into<String>, f: CustomFn) {
        self.mixers.register(name, f);
    }

    pub fn register_extractor(&mut self, name: impl Into<String>, f: CustomFn) {
        self.extractors.register(name, f);
    }

    pub fn register_mover(&mut self, name: impl Into<String>, f: CustomFn) {
        self.movers.register(name, f);
    }

    pub fn resolve_iterator(&self, name: &str) -> Result<CustomFn, PluginError> {
        self.iterators.resolve(name, "iterator")
    }

    pub fn resolve_mixer(&self, name: &str) -> Result<CustomFn, PluginError> {
        self.mixers.resolve(name, "mixer")
    }

    pub fn resolve_extractor(&self, name: &str) -> Result<CustomFn, PluginError> {
        self.extractors.resolve(name, "extractor")
    }

    pub fn resolve_mover(&self, name: &str) -> Result<CustomFn, PluginError> {
        self.movers.resolve(name, "mover")
    }
}

/// Wraps a custom kernel so that it replaces the default function list only
/// for the stages it opts into (`only_for`), falling back to `default` for
/// every other stage — the same delegation rule bundled plugins can't avoid
/// for stages they don't know about.
pub struct CustomOverride<D: FunctionProvider> {
    custom: CustomFn,
    only_for: Vec<Stage>,
    default: D,
}

impl<D: FunctionProvider> CustomOverride<D> {
    pub fn new(custom: CustomFn, only_for: Vec<Stage>, default: D) -> Self {
        Self { custom, only_for, default }
    }
}

impl<D: FunctionProvider> FunctionProvider for CustomOverride<D> {
    fn functions_for(&self, stage: Stage) -> Vec<KernelFn> {
        if self.only_for.contains(&stage) {
            vec![self.custom.clone()]
        } else {
            self.default.functions_for(stage)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterate::DefaultIterator;

    fn noop() -> CustomFn {
        std::sync::Arc::new(|_ctx| Ok(()))
    }

    #[test]
    fn resolves_registered_plugin_by_name() {
        let mut registry = PluginRegistry::new();
        registry.register_iterator("my_iterator", noop());
        assert!(registry.resolve_iterator("my_iterator").is_ok());
    }

    #[test]
    fn unregistered_name_is_not_found() {
        let registry = PluginRegistry::new();
        let err = registry.resolve_iterator("missing");
        assert!(matches!(err, Err(PluginError::NotFound { kind: "iterator", .. })));
    }

    #[test]
    fn custom_override_falls_back_to_default_outside_its_stages() {
        let wrapper = CustomOverride::new(noop(), vec![Stage::Infect], DefaultIterator);
        assert_eq!(wrapper.functions_for(Stage::Infect).len(), 1);
        assert_eq!(
            wrapper.functions_for(Stage::Setup).len(),
            DefaultIterator.functions_for(Stage::Setup).len()
        );
    }
}
