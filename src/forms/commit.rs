//! Writing a finished form into the content repository

use crate::core::identity::NodeRef;
use crate::core::repository::{
    Aspect, AssocType, ContentRepository, ContentWrite, FormAspect, NodeKind,
    RenderingEngineTemplateAspect, RenditionProperties, RepositoryError, TitledAspect,
    ENCODING_UTF8, MIMETYPE_XML,
};
use crate::forms::session::RenderingEngineTemplateEntry;

/// Snapshot of the wizard values needed to create a form
#[derive(Debug, Clone)]
pub struct FormCommit<'a> {
    pub form_name: String,
    pub form_title: Option<String>,
    pub form_description: Option<String>,
    pub schema_file_name: &'a str,
    pub schema: &'a [u8],
    pub schema_root_element_name: Option<String>,
    pub output_path_pattern_for_form_instance_data: String,
    pub default_workflow_name: Option<String>,
    pub templates: &'a [RenderingEngineTemplateEntry],
}

/// Nodes written for one template entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTemplate {
    pub file_name: String,
    pub node: NodeRef,
    /// False when an earlier entry of the same name already created the node
    pub created: bool,
    pub rendition_properties: NodeRef,
}

/// Nodes written for a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedForm {
    pub name: String,
    pub folder: NodeRef,
    pub schema: NodeRef,
    pub templates: Vec<CommittedTemplate>,
}

/// Create the form folder, its schema, and every queued template
///
/// Runs as a plain sequence of repository calls; callers wrap it in a
/// transaction so a failure part way through leaves nothing behind.
pub fn commit_form<R>(repo: &mut R, form: &FormCommit<'_>) -> Result<CommittedForm, RepositoryError>
where
    R: ContentRepository + ?Sized,
{
    tracing::debug!("creating form {}", form.form_name);

    let container = repo.forms_container()?;
    let folder = repo.create(&container, &form.form_name, NodeKind::Folder)?;
    let folder_ref = folder.node_ref;

    let schema = repo.create(&folder_ref, form.schema_file_name, NodeKind::Content)?;
    repo.write_content(
        &schema.node_ref,
        ContentWrite {
            mimetype: Some(MIMETYPE_XML),
            encoding: ENCODING_UTF8,
            bytes: form.schema,
        },
    )?;

    repo.add_aspect(
        &folder_ref,
        Aspect::Titled(TitledAspect {
            title: form.form_title.clone(),
            description: form.form_description.clone(),
        }),
    )?;
    repo.add_aspect(
        &folder_ref,
        Aspect::Form(FormAspect {
            xml_schema: schema.node_ref,
            xml_schema_root_element_name: form.schema_root_element_name.clone(),
            output_path_pattern_for_form_instance_data: form
                .output_path_pattern_for_form_instance_data
                .clone(),
            default_workflow_name: form.default_workflow_name.clone(),
        }),
    )?;

    let mut templates = Vec::with_capacity(form.templates.len());
    for entry in form.templates {
        templates.push(commit_template(repo, &folder_ref, &form.form_name, entry)?);
    }

    Ok(CommittedForm {
        name: form.form_name.clone(),
        folder: folder_ref,
        schema: schema.node_ref,
        templates,
    })
}

fn commit_template<R>(
    repo: &mut R,
    folder: &NodeRef,
    form_name: &str,
    entry: &RenderingEngineTemplateEntry,
) -> Result<CommittedTemplate, RepositoryError>
where
    R: ContentRepository + ?Sized,
{
    tracing::debug!("adding rendering engine template {} to form {}", entry, form_name);

    let existing = repo.search_simple(folder, &entry.file_name)?;
    let created = existing.is_none();

    let node = match existing {
        Some(node) => node,
        None => {
            let file = match repo.create(folder, &entry.file_name, NodeKind::Content) {
                Ok(file) => file,
                Err(err @ RepositoryError::FileExists { .. }) => {
                    tracing::error!("{}", err);
                    return Err(err);
                }
                Err(err) => return Err(err),
            };
            tracing::debug!("created file node for file: {}", entry.file_name);
            let node = file.node_ref;

            // The template's own mimetype is not known
            repo.write_content(
                &node,
                ContentWrite {
                    mimetype: None,
                    encoding: ENCODING_UTF8,
                    bytes: &entry.content,
                },
            )?;

            repo.create_association(folder, &node, AssocType::RenderingEngineTemplates)?;
            repo.add_aspect(
                &node,
                Aspect::RenderingEngineTemplate(RenderingEngineTemplateAspect {
                    parent_rendering_engine_name: entry.rendering_engine.name.to_string(),
                    form_source: *folder,
                }),
            )?;
            repo.add_aspect(
                &node,
                Aspect::Titled(TitledAspect {
                    title: entry.title.clone(),
                    description: entry.description.clone(),
                }),
            )?;
            node
        }
    };

    tracing::debug!("adding rendition properties to {}", node);
    let rendition_properties = repo.create_child(
        &node,
        AssocType::RenditionProperties,
        RenditionProperties {
            output_path_pattern_for_rendition: entry.output_path_pattern_for_rendition.clone(),
            mimetype_for_rendition: entry.mimetype_for_rendition.clone(),
        },
    )?;

    Ok(CommittedTemplate {
        file_name: entry.file_name.clone(),
        node,
        created,
        rendition_properties,
    })
}
