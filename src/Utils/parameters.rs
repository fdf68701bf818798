use serde_json::Value;
use std::collections::HashMap;

/// One registered run-time parameter: its default and a human readable description.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    pub default: Value,
    pub description: String,
    pub value: Option<Value>,
}

/// Registry of run-time parameters. Modules register what they understand with a
/// default, the driver may override values afterwards (from a config file or the CLI).
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    entries: HashMap<String, ParameterEntry>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
    /// registering the same name twice keeps the first default
    pub fn register(&mut self, name: &str, default: Value, description: &str) {
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| ParameterEntry {
                default,
                description: description.to_string(),
                value: None,
            });
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), String> {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.value = Some(value);
                Ok(())
            }
            None => Err(format!("Parameter '{}' was never registered", name)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .get(name)
            .map(|entry| entry.value.as_ref().unwrap_or(&entry.default))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, String> {
        self.get(name)
            .ok_or(format!("Parameter '{}' was never registered", name))?
            .as_bool()
            .ok_or(format!("Parameter '{}' is not a boolean", name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
