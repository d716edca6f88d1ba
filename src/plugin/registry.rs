use crate::config::ToolConfiguration;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::Plugin;

/// Plugin registry keyed by unique plugin name
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, RegisteredPlugin>,
    /// Registration order, which is always a valid dependency order
    order: Vec<String>,
}

/// A registered plugin with its registration-time settings
#[derive(Clone)]
pub struct RegisteredPlugin {
    pub plugin: Arc<dyn Plugin>,
    pub config: Option<ToolConfiguration>,
    pub registered_at: DateTime<Utc>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin in the registry
    pub fn register(
        &mut self,
        plugin: Arc<dyn Plugin>,
        config: Option<ToolConfiguration>,
    ) -> Result<()> {
        let name = plugin.name().to_string();

        // Check for name conflicts
        if self.plugins.contains_key(&name) {
            return Err(Error::DuplicatePlugin(name));
        }

        // Dependencies must already be present
        if let Some(missing) = plugin
            .dependencies()
            .iter()
            .find(|dep| !self.plugins.contains_key(dep.as_str()))
        {
            return Err(Error::MissingDependency {
                plugin: name,
                dependency: missing.clone(),
            });
        }

        self.order.push(name.clone());
        self.plugins.insert(
            name,
            RegisteredPlugin {
                plugin,
                config,
                registered_at: Utc::now(),
            },
        );

        Ok(())
    }

    /// Unregister a plugin from the registry
    pub fn unregister(&mut self, name: &str) -> Result<RegisteredPlugin> {
        let entry = self
            .plugins
            .remove(name)
            .ok_or_else(|| Error::PluginNotFound(name.to_string()))?;
        self.order.retain(|n| n != name);
        Ok(entry)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.plugins.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugin names in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Registered plugins in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegisteredPlugin)> {
        self.order
            .iter()
            .filter_map(move |name| self.plugins.get(name).map(|entry| (name, entry)))
    }

    /// Plugins that match a capability filter, in registration order
    pub fn filter<F>(&self, predicate: F) -> Vec<Arc<dyn Plugin>>
    where
        F: Fn(&dyn Plugin) -> bool,
    {
        self.iter()
            .filter(|(_, entry)| predicate(entry.plugin.as_ref()))
            .map(|(_, entry)| entry.plugin.clone())
            .collect()
    }

    /// Get plugins that depend on a specific plugin
    pub fn dependents(&self, plugin_name: &str) -> Vec<String> {
        self.iter()
            .filter(|(_, entry)| {
                entry
                    .plugin
                    .dependencies()
                    .iter()
                    .any(|dep| dep == plugin_name)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Get plugin dependency graph
    pub fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();

        for name in &self.order {
            graph.add_node(name.clone());
        }

        for (name, entry) in self.iter() {
            for dep in entry.plugin.dependencies() {
                graph.add_edge(name.clone(), dep.clone());
            }
        }

        graph
    }

    /// Get load order based on dependencies
    pub fn load_order(&self) -> Result<Vec<String>> {
        self.dependency_graph().topological_sort()
    }
}

/// Dependency graph for plugin initialization order
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: String) {
        if !self.edges.contains_key(&name) {
            self.nodes.push(name.clone());
            self.edges.insert(name, Vec::new());
        }
    }

    /// `from` depends on `to`
    pub fn add_edge(&mut self, from: String, to: String) {
        self.add_node(to.clone());
        self.add_node(from.clone());
        self.edges.entry(from).or_default().push(to);
    }

    /// Topological sort with dependencies before dependents
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        let mut visited = HashSet::new();
        let mut temp_visited = HashSet::new();
        let mut result = Vec::new();

        for node in &self.nodes {
            if !visited.contains(node) {
                self.dfs_visit(node, &mut visited, &mut temp_visited, &mut result)?;
            }
        }

        Ok(result)
    }

    fn dfs_visit(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        temp_visited: &mut HashSet<String>,
        result: &mut Vec<String>,
    ) -> Result<()> {
        if temp_visited.contains(node) {
            return Err(Error::CircularDependency(format!(
                "Circular dependency detected involving plugin: {node}"
            )));
        }

        if visited.contains(node) {
            return Ok(());
        }

        temp_visited.insert(node.to_string());

        if let Some(dependencies) = self.edges.get(node) {
            for dep in dependencies {
                self.dfs_visit(dep, visited, temp_visited, result)?;
            }
        }

        temp_visited.remove(node);
        visited.insert(node.to_string());
        result.push(node.to_string());

        Ok(())
    }

    /// Check if the graph has cycles
    pub fn has_cycles(&self) -> bool {
        self.topological_sort().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPlugin;

    fn plugin(name: &str, deps: &[&str]) -> Arc<dyn Plugin> {
        Arc::new(MockPlugin::new(name).with_dependencies(deps))
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("eslint", &[]), None).unwrap();

        let err = registry.register(plugin("eslint", &[]), None).unwrap_err();
        assert!(matches!(err, Error::DuplicatePlugin(name) if name == "eslint"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_requires_dependencies_first() {
        let mut registry = PluginRegistry::new();
        let err = registry
            .register(plugin("jest", &["typescript"]), None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingDependency { ref dependency, .. } if dependency == "typescript"
        ));
        assert!(registry.is_empty());

        registry.register(plugin("typescript", &[]), None).unwrap();
        registry
            .register(plugin("jest", &["typescript"]), None)
            .unwrap();
        assert_eq!(registry.names(), ["typescript", "jest"]);
        assert_eq!(registry.dependents("typescript"), vec!["jest".to_string()]);
    }

    #[test]
    fn test_unregister_keeps_order_consistent() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("a", &[]), None).unwrap();
        registry.register(plugin("b", &[]), None).unwrap();
        registry.register(plugin("c", &[]), None).unwrap();

        registry.unregister("b").unwrap();
        assert_eq!(registry.names(), ["a", "c"]);
        assert!(matches!(
            registry.unregister("b"),
            Err(Error::PluginNotFound(_))
        ));
    }

    #[test]
    fn test_load_order_puts_dependencies_first() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin("base", &[]), None).unwrap();
        registry.register(plugin("mid", &["base"]), None).unwrap();
        registry.register(plugin("top", &["mid", "base"]), None).unwrap();

        let order = registry.load_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("base") < pos("mid"));
        assert!(pos("mid") < pos("top"));
    }

    #[test]
    fn test_cycle_detection() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a".to_string(), "b".to_string());
        graph.add_edge("b".to_string(), "c".to_string());
        assert!(!graph.has_cycles());

        graph.add_edge("c".to_string(), "a".to_string());
        assert!(graph.has_cycles());
        assert!(matches!(
            graph.topological_sort(),
            Err(Error::CircularDependency(_))
        ));
    }
}
