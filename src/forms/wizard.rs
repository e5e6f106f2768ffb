//! The "create form" wizard
//!
//! Collects a schema, naming details, rendering engine templates and an
//! optional default workflow across several steps, then registers the form
//! in the content repository in a single transaction.
//!
//! State lives in a [`FormSession`]; the wizard itself only holds the
//! read-only services (mimetypes, rendering engines, workflows) its derived
//! values are computed from.

use std::fmt;
use thiserror::Error;

use crate::core::config::Config;
use crate::core::mimetype::MimetypeMap;
use crate::core::repository::{in_transaction, ContentRepository, RepositoryError};
use crate::core::upload::{UploadSlot, UploadedFile};
use crate::core::workflow::{WorkflowCatalog, WorkflowDefinition};
use crate::forms::commit::{commit_form, CommittedForm, FormCommit};
use crate::forms::engine::RenderingEngineRegistry;
use crate::forms::schema::{root_element_names, SchemaError};
use crate::forms::session::{
    FormSession, RenderingEngineTemplateEntry, WizardPhase, WizardStep,
    NO_DEFAULT_WORKFLOW_SELECTED,
};

/// Services the wizard consults while deriving values
#[derive(Debug, Clone, Default)]
pub struct WizardServices {
    pub mimetypes: MimetypeMap,
    pub engines: RenderingEngineRegistry,
    pub workflows: WorkflowCatalog,
}

impl WizardServices {
    /// Services with the workflows configured for a project
    pub fn from_config(config: &Config) -> Self {
        Self {
            mimetypes: MimetypeMap::new(),
            engines: RenderingEngineRegistry::default(),
            workflows: WorkflowCatalog::from_config(&config.workflows),
        }
    }
}

/// One entry of the default workflow selection list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowChoice {
    pub value: String,
    pub label: String,
    pub description: Option<String>,
}

/// Lifecycle actions, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Next,
    Back,
    Finish,
    Complete,
    Cancel,
}

impl fmt::Display for WizardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardAction::Next => write!(f, "next"),
            WizardAction::Back => write!(f, "back"),
            WizardAction::Finish => write!(f, "finish"),
            WizardAction::Complete => write!(f, "complete"),
            WizardAction::Cancel => write!(f, "cancel"),
        }
    }
}

/// Wizard for registering a new XML form
#[derive(Debug, Clone, Default)]
pub struct CreateFormWizard {
    services: WizardServices,
}

impl CreateFormWizard {
    pub fn new(services: WizardServices) -> Self {
        Self { services }
    }

    // ------------------------------------------------------------------
    // Lifecycle

    /// Start a fresh run: forget every field and upload
    pub fn init(&self, session: &mut FormSession) {
        *session = FormSession::new();
    }

    /// Whether "next" is blocked on the current step
    pub fn next_disabled(&self, session: &FormSession) -> bool {
        match session.phase {
            WizardPhase::Collecting(WizardStep::Details) => session
                .schema_file_name()
                .map_or(true, |name| name.is_empty()),
            WizardPhase::Collecting(_) => false,
            _ => true,
        }
    }

    pub fn next(&self, session: &mut FormSession) -> Result<WizardPhase, WizardError> {
        if matches!(session.phase, WizardPhase::Collecting(WizardStep::Details))
            && self.next_disabled(session)
        {
            return Err(WizardError::SchemaRequired);
        }
        session.phase = session.phase.next()?;
        Ok(session.phase)
    }

    pub fn back(&self, session: &mut FormSession) -> Result<WizardPhase, WizardError> {
        session.phase = session.phase.back()?;
        Ok(session.phase)
    }

    /// Abandon the run, clearing uploads and entered values
    pub fn cancel(&self, session: &mut FormSession) -> Result<(), WizardError> {
        session.phase = session.phase.cancel()?;
        session.uploads.clear_all();
        session.discard();
        Ok(())
    }

    /// Register the form in `repo`
    ///
    /// Only valid from the review phase. The whole write runs in one
    /// repository transaction; on failure the session returns to review with
    /// its values intact.
    pub fn finish<R>(
        &self,
        session: &mut FormSession,
        repo: &mut R,
    ) -> Result<CommittedForm, WizardError>
    where
        R: ContentRepository + ?Sized,
    {
        session.phase = session.phase.begin_commit()?;

        match self.commit(session, repo) {
            Ok(committed) => {
                session.phase = session.phase.complete()?;
                session.discard();
                Ok(committed)
            }
            Err(err) => {
                session.phase = session.phase.abort_commit()?;
                Err(err)
            }
        }
    }

    fn commit<R>(&self, session: &FormSession, repo: &mut R) -> Result<CommittedForm, WizardError>
    where
        R: ContentRepository + ?Sized,
    {
        let schema = session.schema_file().ok_or(WizardError::SchemaRequired)?;
        let form_name = session.form_name().ok_or(WizardError::SchemaRequired)?;

        let request = FormCommit {
            form_name,
            form_title: session.form_title(),
            form_description: session.form_description().map(String::from),
            schema_file_name: &schema.file_name,
            schema: &schema.content,
            schema_root_element_name: session.schema_root_element_name().map(String::from),
            output_path_pattern_for_form_instance_data: session
                .output_path_pattern_for_form_instance_data()
                .to_string(),
            default_workflow_name: session.selected_workflow_name().map(String::from),
            templates: session.rendering_engine_templates(),
        };

        let committed = in_transaction(repo, |repo| commit_form(repo, &request))?;
        Ok(committed)
    }

    // ------------------------------------------------------------------
    // Uploads

    /// Upload the schema, replacing any earlier one
    pub fn upload_schema(&self, session: &mut FormSession, file: UploadedFile) {
        session.uploads.put(UploadSlot::Schema, file);
    }

    pub fn remove_uploaded_schema_file(&self, session: &mut FormSession) {
        session.uploads.clear(UploadSlot::Schema);
    }

    /// Upload the template for the next entry, replacing any earlier one
    pub fn upload_rendering_engine_template(&self, session: &mut FormSession, file: UploadedFile) {
        session.uploads.put(UploadSlot::RenderingEngineTemplate, file);
    }

    pub fn remove_uploaded_rendering_engine_template_file(&self, session: &mut FormSession) {
        session.uploads.clear(UploadSlot::RenderingEngineTemplate);
    }

    // ------------------------------------------------------------------
    // Schema

    /// Candidate root element names declared by the uploaded schema
    ///
    /// Empty when no schema is uploaded. A schema that cannot be parsed is
    /// reported on the session and removed, so "next" is blocked again.
    pub fn schema_root_element_choices(
        &self,
        session: &mut FormSession,
    ) -> Result<Vec<String>, WizardError> {
        let Some(schema) = session.schema_file() else {
            return Ok(Vec::new());
        };

        match root_element_names(&schema.content, schema.source_dir.as_deref()) {
            Ok(names) => Ok(names),
            Err(source) => {
                let file_name = schema.file_name.clone();
                let message = format!("unable to parse {}", file_name);
                tracing::error!("{}: {}", message, source);

                self.remove_uploaded_schema_file(session);
                session.report_error(format!("{}: {}", message, source));
                Err(WizardError::SchemaParse { file_name, source })
            }
        }
    }

    // ------------------------------------------------------------------
    // Template entry being prepared

    /// Rendering engine for the next entry, guessed from the template file
    /// when none was chosen
    pub fn rendering_engine_name(&self, session: &FormSession) -> Option<&'static str> {
        session
            .rendering_engine
            .or_else(|| {
                session
                    .rendering_engine_template_file_name()
                    .and_then(|name| self.services.engines.guess_rendering_engine(name))
            })
            .map(|engine| engine.name)
    }

    /// Choose the rendering engine by name; `None` returns to guessing
    pub fn set_rendering_engine_name(
        &self,
        session: &mut FormSession,
        name: Option<&str>,
    ) -> Result<(), WizardError> {
        session.rendering_engine = match name {
            None => None,
            Some(name) => Some(
                self.services
                    .engines
                    .rendering_engine(name)
                    .ok_or_else(|| WizardError::UnknownRenderingEngine(name.to_string()))?,
            ),
        };
        Ok(())
    }

    pub fn rendering_engine_choices(&self) -> Vec<&'static str> {
        self.services.engines.rendering_engine_choices()
    }

    /// Mimetype of the rendition, guessed from an entered output path when
    /// not set explicitly
    pub fn mimetype_for_rendition(&self, session: &FormSession) -> Option<String> {
        session.mimetype_for_rendition.clone().or_else(|| {
            session
                .output_path_pattern_for_rendition
                .as_deref()
                .map(|pattern| self.services.mimetypes.guess_mimetype(pattern))
        })
    }

    /// (mimetype, label) pairs sorted by label
    pub fn mimetype_choices(&self) -> Vec<(String, String)> {
        self.services.mimetypes.choices()
    }

    /// Queue the prepared template and reset the entry fields
    pub fn add_selected_rendering_engine_template(
        &self,
        session: &mut FormSession,
    ) -> Result<(), WizardError> {
        let file = session
            .rendering_engine_template_file()
            .cloned()
            .ok_or(WizardError::TemplateRequired)?;

        let engine = session
            .rendering_engine
            .or_else(|| self.services.engines.guess_rendering_engine(&file.file_name))
            .ok_or_else(|| WizardError::RenderingEngineRequired(file.file_name.clone()))?;

        let entry = RenderingEngineTemplateEntry {
            title: session.rendering_engine_template_title(),
            description: session
                .rendering_engine_template_description()
                .map(String::from),
            output_path_pattern_for_rendition: session
                .output_path_pattern_for_rendition()
                .to_string(),
            mimetype_for_rendition: self.mimetype_for_rendition(session),
            rendering_engine: engine,
            file_name: file.file_name,
            content: file.content,
        };

        tracing::debug!("queued rendering engine template {}", entry);
        session.templates.push(entry);
        session.clear_template_fields();
        Ok(())
    }

    /// Remove the entry selected in the template list
    pub fn remove_selected_rendering_engine_template(
        &self,
        session: &mut FormSession,
    ) -> Option<RenderingEngineTemplateEntry> {
        let index = session.selected_template.take()?;
        if index < session.templates.len() {
            Some(session.templates.remove(index))
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Default workflow

    /// The definition of the selected default workflow, if any
    pub fn default_workflow_definition(&self, session: &FormSession) -> Option<&WorkflowDefinition> {
        session
            .selected_workflow_name()
            .and_then(|name| self.services.workflows.definition_for(name))
    }

    /// "None" followed by every available workflow definition
    pub fn default_workflow_choices(&self) -> Vec<WorkflowChoice> {
        let mut choices = vec![WorkflowChoice {
            value: NO_DEFAULT_WORKFLOW_SELECTED.to_string(),
            label: "None".to_string(),
            description: None,
        }];
        choices.extend(
            self.services
                .workflows
                .definitions()
                .iter()
                .map(|def| WorkflowChoice {
                    value: def.name.clone(),
                    label: def.title.clone(),
                    description: def.description.clone(),
                }),
        );
        choices
    }
}

/// Errors raised by wizard actions
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("a schema file must be uploaded first")]
    SchemaRequired,

    #[error("unable to parse {file_name}: {source}")]
    SchemaParse {
        file_name: String,
        #[source]
        source: SchemaError,
    },

    #[error("a rendering engine template file must be uploaded first")]
    TemplateRequired,

    #[error("no rendering engine handles {0}; choose one explicitly")]
    RenderingEngineRequired(String),

    #[error("unknown rendering engine: {0}")]
    UnknownRenderingEngine(String),

    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        phase: WizardPhase,
        action: WizardAction,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
