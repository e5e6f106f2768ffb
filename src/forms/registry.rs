//! Read-only views over forms already registered in a repository

use serde::Serialize;

use crate::core::identity::NodeRef;
use crate::core::repository::{AssocType, ContentRepository, NodeKind, NodeRecord, RepositoryError};

/// A registered form as shown by `form list` and `form show`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredForm {
    pub name: String,
    pub node: NodeRef,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: String,
    pub schema_root_element_name: Option<String>,
    pub output_path_pattern_for_form_instance_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_workflow_name: Option<String>,
    pub creator: String,
    pub created: String,
    pub rendering_engine_templates: Vec<RegisteredTemplate>,
}

/// A rendering engine template of a registered form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredTemplate {
    pub file_name: String,
    pub node: NodeRef,
    pub title: Option<String>,
    pub rendering_engine: String,
    pub renditions: Vec<RegisteredRendition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredRendition {
    pub output_path_pattern: String,
    pub mimetype: Option<String>,
}

/// Every form folder under the forms container, by name
pub fn list_forms<R>(repo: &R) -> Result<Vec<RegisteredForm>, RepositoryError>
where
    R: ContentRepository + ?Sized,
{
    let container = repo.forms_container()?;
    let mut forms = Vec::new();
    for child in repo.children(&container)? {
        if child.kind == NodeKind::Folder && child.aspects.form.is_some() {
            forms.push(describe(repo, child)?);
        }
    }
    forms.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(forms)
}

/// Look up one registered form by folder name
pub fn find_form<R>(repo: &R, name: &str) -> Result<Option<RegisteredForm>, RepositoryError>
where
    R: ContentRepository + ?Sized,
{
    let container = repo.forms_container()?;
    let Some(node) = repo.search_simple(&container, name)? else {
        return Ok(None);
    };

    let record = repo.node(&node)?;
    if record.aspects.form.is_none() {
        return Ok(None);
    }
    describe(repo, record).map(Some)
}

fn describe<R>(repo: &R, folder: NodeRecord) -> Result<RegisteredForm, RepositoryError>
where
    R: ContentRepository + ?Sized,
{
    let titled = folder.aspects.titled.unwrap_or_default();
    let form = folder.aspects.form.ok_or(RepositoryError::WrongKind {
        node: folder.id,
        kind: folder.kind,
        operation: "describe form",
    })?;
    let schema = repo.node(&form.xml_schema)?;

    let mut templates = Vec::new();
    for assoc in &folder.associations {
        if assoc.assoc_type != AssocType::RenderingEngineTemplates {
            continue;
        }
        let node = repo.node(&assoc.target)?;
        let renditions = repo
            .children(&node.id)?
            .into_iter()
            .filter_map(|child| child.rendition_properties)
            .map(|props| RegisteredRendition {
                output_path_pattern: props.output_path_pattern_for_rendition,
                mimetype: props.mimetype_for_rendition,
            })
            .collect();

        templates.push(RegisteredTemplate {
            file_name: node.name,
            node: node.id,
            title: node.aspects.titled.and_then(|t| t.title),
            rendering_engine: node
                .aspects
                .rendering_engine_template
                .map(|a| a.parent_rendering_engine_name)
                .unwrap_or_default(),
            renditions,
        });
    }

    Ok(RegisteredForm {
        name: folder.name,
        node: folder.id,
        title: titled.title,
        description: titled.description,
        schema: schema.name,
        schema_root_element_name: form.xml_schema_root_element_name,
        output_path_pattern_for_form_instance_data: form.output_path_pattern_for_form_instance_data,
        default_workflow_name: form.default_workflow_name,
        creator: folder.creator,
        created: folder.created.to_rfc3339(),
        rendering_engine_templates: templates,
    })
}
