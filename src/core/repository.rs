//! Content repository abstraction
//!
//! The repository is a tree of nodes. Folder and content nodes are addressed
//! by name within their parent; metadata nodes hang off a parent through a
//! typed association. Metadata is attached as aspects, each an explicit
//! struct rather than a free-form property map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::identity::NodeRef;

/// Mimetype written for XML schema content
pub const MIMETYPE_XML: &str = "text/xml";

/// Encoding used for all written content
pub const ENCODING_UTF8: &str = "UTF-8";

/// Kind of a repository node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Folder,
    Content,
    RenditionProperties,
}

impl NodeKind {
    /// Whether nodes of this kind are addressed by name within their parent
    pub fn is_named(&self) -> bool {
        matches!(self, NodeKind::Folder | NodeKind::Content)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Folder => write!(f, "folder"),
            NodeKind::Content => write!(f, "content"),
            NodeKind::RenditionProperties => write!(f, "rendition-properties"),
        }
    }
}

/// Association types between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssocType {
    /// Form folder to each of its rendering engine templates
    RenderingEngineTemplates,
    /// Template node to its rendition properties child
    RenditionProperties,
}

impl fmt::Display for AssocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssocType::RenderingEngineTemplates => write!(f, "rendering-engine-templates"),
            AssocType::RenditionProperties => write!(f, "rendition-properties"),
        }
    }
}

/// Title and description of a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitledAspect {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Marks a folder as a registered XML form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAspect {
    /// The schema content node inside the form folder
    pub xml_schema: NodeRef,
    pub xml_schema_root_element_name: Option<String>,
    pub output_path_pattern_for_form_instance_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_workflow_name: Option<String>,
}

/// Marks a content node as a template for a rendering engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderingEngineTemplateAspect {
    pub parent_rendering_engine_name: String,
    /// The form folder this template was registered with
    pub form_source: NodeRef,
}

/// Properties of one rendition produced by a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionProperties {
    pub output_path_pattern_for_rendition: String,
    pub mimetype_for_rendition: Option<String>,
}

/// An aspect that can be attached to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aspect {
    Titled(TitledAspect),
    Form(FormAspect),
    RenderingEngineTemplate(RenderingEngineTemplateAspect),
}

impl Aspect {
    pub fn name(&self) -> &'static str {
        match self {
            Aspect::Titled(_) => "titled",
            Aspect::Form(_) => "form",
            Aspect::RenderingEngineTemplate(_) => "rendering-engine-template",
        }
    }
}

/// Aspects currently applied to a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeAspects {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titled: Option<TitledAspect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FormAspect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendering_engine_template: Option<RenderingEngineTemplateAspect>,
}

impl NodeAspects {
    /// Apply an aspect, replacing any earlier value of the same aspect
    pub fn apply(&mut self, aspect: Aspect) {
        match aspect {
            Aspect::Titled(a) => self.titled = Some(a),
            Aspect::Form(a) => self.form = Some(a),
            Aspect::RenderingEngineTemplate(a) => self.rendering_engine_template = Some(a),
        }
    }
}

/// Metadata recorded for written content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentData {
    pub mimetype: Option<String>,
    pub encoding: String,
    pub size: u64,
    pub sha256: String,
}

/// A request to write the content of a node
#[derive(Debug, Clone)]
pub struct ContentWrite<'a> {
    pub mimetype: Option<&'a str>,
    pub encoding: &'a str,
    pub bytes: &'a [u8],
}

/// A peer association from one node to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub assoc_type: AssocType,
    pub target: NodeRef,
}

/// Summary of a freshly created file or folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub node_ref: NodeRef,
    pub name: String,
    pub kind: NodeKind,
}

/// Full record of a node as held by the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeRef,
    pub parent: Option<NodeRef>,
    pub name: String,
    pub kind: NodeKind,
    /// Child association through which a metadata node hangs off its parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_assoc: Option<AssocType>,
    /// Location relative to the repository root, for folders and content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentData>,
    #[serde(default)]
    pub aspects: NodeAspects,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendition_properties: Option<RenditionProperties>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<Association>,
}

/// Operations a content repository offers to the forms layer
pub trait ContentRepository {
    /// The container folder all forms are created under
    fn forms_container(&self) -> Result<NodeRef, RepositoryError>;

    /// Create a named folder or content node
    ///
    /// Fails with [`RepositoryError::FileExists`] when the parent already has
    /// a child of that name.
    fn create(
        &mut self,
        parent: &NodeRef,
        name: &str,
        kind: NodeKind,
    ) -> Result<FileInfo, RepositoryError>;

    /// Find a named child directly under `parent`
    fn search_simple(&self, parent: &NodeRef, name: &str)
        -> Result<Option<NodeRef>, RepositoryError>;

    /// Replace the content of a content node
    fn write_content(&mut self, node: &NodeRef, write: ContentWrite<'_>)
        -> Result<(), RepositoryError>;

    fn read_content(&self, node: &NodeRef) -> Result<Vec<u8>, RepositoryError>;

    fn add_aspect(&mut self, node: &NodeRef, aspect: Aspect) -> Result<(), RepositoryError>;

    fn create_association(
        &mut self,
        source: &NodeRef,
        target: &NodeRef,
        assoc_type: AssocType,
    ) -> Result<(), RepositoryError>;

    /// Create a rendition properties node under `parent`
    fn create_child(
        &mut self,
        parent: &NodeRef,
        assoc_type: AssocType,
        properties: RenditionProperties,
    ) -> Result<NodeRef, RepositoryError>;

    fn node(&self, node: &NodeRef) -> Result<NodeRecord, RepositoryError>;

    /// All children of `parent`, in creation order
    fn children(&self, parent: &NodeRef) -> Result<Vec<NodeRecord>, RepositoryError>;

    fn begin(&mut self) -> Result<(), RepositoryError>;

    fn commit(&mut self) -> Result<(), RepositoryError>;

    fn rollback(&mut self) -> Result<(), RepositoryError>;
}

/// Run `f` inside a repository transaction
///
/// Commits when `f` succeeds, rolls back and returns the original error when
/// it fails. A failed commit is rolled back too, so the repository never
/// stays inside the transaction.
pub fn in_transaction<R, T, E, F>(repo: &mut R, f: F) -> Result<T, E>
where
    R: ContentRepository + ?Sized,
    E: From<RepositoryError>,
    F: FnOnce(&mut R) -> Result<T, E>,
{
    repo.begin()?;
    match f(repo) {
        Ok(value) => match repo.commit() {
            Ok(()) => Ok(value),
            Err(commit_err) => {
                if let Err(rollback_err) = repo.rollback() {
                    tracing::error!("rollback failed: {}", rollback_err);
                }
                Err(commit_err.into())
            }
        },
        Err(err) => {
            if let Err(rollback_err) = repo.rollback() {
                tracing::error!("rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

/// Errors raised by repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{name} already exists in {parent}")]
    FileExists { name: String, parent: NodeRef },

    #[error("node not found: {0}")]
    NodeNotFound(NodeRef),

    #[error("{node} is a {kind} node and cannot {operation}")]
    WrongKind {
        node: NodeRef,
        kind: NodeKind,
        operation: &'static str,
    },

    #[error("invalid node name: '{0}'")]
    InvalidName(String),

    #[error("a transaction is already active")]
    TransactionActive,

    #[error("no active transaction")]
    NoTransaction,

    #[error("failed to parse repository index: {message}")]
    YamlError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_replaces_same_aspect() {
        let mut aspects = NodeAspects::default();
        aspects.apply(Aspect::Titled(TitledAspect {
            title: Some("First".to_string()),
            description: None,
        }));
        aspects.apply(Aspect::Titled(TitledAspect {
            title: Some("Second".to_string()),
            description: Some("desc".to_string()),
        }));

        let titled = aspects.titled.unwrap();
        assert_eq!(titled.title.as_deref(), Some("Second"));
        assert_eq!(titled.description.as_deref(), Some("desc"));
        assert!(aspects.form.is_none());
    }

    #[test]
    fn test_form_aspect_omits_missing_workflow() {
        let aspect = FormAspect {
            xml_schema: NodeRef::new(),
            xml_schema_root_element_name: Some("article".to_string()),
            output_path_pattern_for_form_instance_data: "${name}.xml".to_string(),
            default_workflow_name: None,
        };
        let yaml = serde_yml::to_string(&aspect).unwrap();
        assert!(!yaml.contains("default_workflow_name"));
    }

    #[test]
    fn test_named_kinds() {
        assert!(NodeKind::Folder.is_named());
        assert!(NodeKind::Content.is_named());
        assert!(!NodeKind::RenditionProperties.is_named());
    }
}
