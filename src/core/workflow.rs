//! Workflow definition catalogue
//!
//! Forms may name a default workflow that submitted form instance data is
//! routed through. Definitions are identified by `<engine>$<name>`; the
//! wizard only ever stores the bare name.

use serde::{Deserialize, Serialize};

/// Engine prefix of every workflow definition id
pub const WORKFLOW_ENGINE_PREFIX: &str = "jbpm$";

/// Workflow definition entry as written in config.yaml
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowDefinitionConfig {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A deployed workflow definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowDefinition {
    /// Engine-qualified id, e.g. `jbpm$wcmwf:submit`
    pub id: String,
    /// Name without the engine prefix
    pub name: String,
    pub title: String,
    pub description: Option<String>,
}

impl WorkflowDefinition {
    pub fn new(name: &str, title: &str, description: Option<&str>) -> Self {
        Self {
            id: format!("{}{}", WORKFLOW_ENGINE_PREFIX, name),
            name: name.to_string(),
            title: title.to_string(),
            description: description.map(String::from),
        }
    }
}

impl From<WorkflowDefinitionConfig> for WorkflowDefinition {
    fn from(config: WorkflowDefinitionConfig) -> Self {
        Self::new(&config.name, &config.title, config.description.as_deref())
    }
}

/// Lookup over the workflow definitions available to forms
#[derive(Debug, Clone)]
pub struct WorkflowCatalog {
    definitions: Vec<WorkflowDefinition>,
}

impl WorkflowCatalog {
    /// Create a catalogue from configured definitions
    ///
    /// Falls back to the built-in definitions when none are configured.
    pub fn from_config(configured: &[WorkflowDefinitionConfig]) -> Self {
        if configured.is_empty() {
            return Self::default();
        }
        Self {
            definitions: configured.iter().cloned().map(WorkflowDefinition::from).collect(),
        }
    }

    pub fn new(definitions: Vec<WorkflowDefinition>) -> Self {
        Self { definitions }
    }

    /// All available definitions
    pub fn definitions(&self) -> &[WorkflowDefinition] {
        &self.definitions
    }

    /// Resolve a definition by its engine-qualified id
    pub fn definition_by_name(&self, id: &str) -> Option<&WorkflowDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Resolve a definition by its bare name
    pub fn definition_for(&self, name: &str) -> Option<&WorkflowDefinition> {
        self.definition_by_name(&format!("{}{}", WORKFLOW_ENGINE_PREFIX, name))
    }
}

impl Default for WorkflowCatalog {
    fn default() -> Self {
        Self {
            definitions: vec![
                WorkflowDefinition::new(
                    "wcmwf:submit",
                    "Submit Web Content",
                    Some("Submit changes for approval"),
                ),
                WorkflowDefinition::new(
                    "wcmwf:changerequest",
                    "Change Request",
                    Some("Request changes to web content"),
                ),
            ],
        }
    }
}
