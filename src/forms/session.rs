//! Per-session state of the "create form" wizard
//!
//! A [`FormSession`] is owned by whoever drives the wizard (one per user
//! session) and handed to [`CreateFormWizard`](super::wizard::CreateFormWizard)
//! by reference. Nothing here is shared between sessions.

use std::fmt;

use crate::core::upload::{UploadSlot, UploadStore, UploadedFile};
use crate::forms::engine::RenderingEngine;
use crate::forms::wizard::{WizardAction, WizardError};

/// Default output path for form instance data
pub const DEFAULT_OUTPUT_PATH_PATTERN_FORM_INSTANCE_DATA: &str = "${name}.xml";

/// Default output path for renditions
pub const DEFAULT_OUTPUT_PATH_PATTERN_RENDITION: &str = "${name}.${extension}";

/// Selection value meaning "no default workflow"
pub const NO_DEFAULT_WORKFLOW_SELECTED: &str = "no_default_workflow_selected";

/// Data-collection steps, in the order they are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    /// Schema upload, form name/title/description, root element, output path
    Details,
    /// Rendering engine templates list
    RenderingEngineTemplates,
    /// Default workflow selection
    DefaultWorkflow,
}

impl WizardStep {
    /// 1-based step number
    pub fn number(&self) -> usize {
        match self {
            WizardStep::Details => 1,
            WizardStep::RenderingEngineTemplates => 2,
            WizardStep::DefaultWorkflow => 3,
        }
    }

    fn next(&self) -> Option<WizardStep> {
        match self {
            WizardStep::Details => Some(WizardStep::RenderingEngineTemplates),
            WizardStep::RenderingEngineTemplates => Some(WizardStep::DefaultWorkflow),
            WizardStep::DefaultWorkflow => None,
        }
    }

    fn previous(&self) -> Option<WizardStep> {
        match self {
            WizardStep::Details => None,
            WizardStep::RenderingEngineTemplates => Some(WizardStep::Details),
            WizardStep::DefaultWorkflow => Some(WizardStep::RenderingEngineTemplates),
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardStep::Details => write!(f, "details"),
            WizardStep::RenderingEngineTemplates => write!(f, "rendering engine templates"),
            WizardStep::DefaultWorkflow => write!(f, "default workflow"),
        }
    }
}

/// Lifecycle of a wizard session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Collecting(WizardStep),
    Reviewing,
    Committing,
    Done,
    Cancelled,
}

impl WizardPhase {
    pub fn next(self) -> Result<WizardPhase, WizardError> {
        match self {
            WizardPhase::Collecting(step) => Ok(step
                .next()
                .map(WizardPhase::Collecting)
                .unwrap_or(WizardPhase::Reviewing)),
            _ => Err(self.invalid(WizardAction::Next)),
        }
    }

    pub fn back(self) -> Result<WizardPhase, WizardError> {
        match self {
            WizardPhase::Collecting(step) => step
                .previous()
                .map(WizardPhase::Collecting)
                .ok_or_else(|| self.invalid(WizardAction::Back)),
            WizardPhase::Reviewing => Ok(WizardPhase::Collecting(WizardStep::DefaultWorkflow)),
            _ => Err(self.invalid(WizardAction::Back)),
        }
    }

    pub fn begin_commit(self) -> Result<WizardPhase, WizardError> {
        match self {
            WizardPhase::Reviewing => Ok(WizardPhase::Committing),
            _ => Err(self.invalid(WizardAction::Finish)),
        }
    }

    pub fn complete(self) -> Result<WizardPhase, WizardError> {
        match self {
            WizardPhase::Committing => Ok(WizardPhase::Done),
            _ => Err(self.invalid(WizardAction::Complete)),
        }
    }

    /// Return to review after a failed commit
    pub fn abort_commit(self) -> Result<WizardPhase, WizardError> {
        match self {
            WizardPhase::Committing => Ok(WizardPhase::Reviewing),
            _ => Err(self.invalid(WizardAction::Complete)),
        }
    }

    pub fn cancel(self) -> Result<WizardPhase, WizardError> {
        match self {
            WizardPhase::Collecting(_) | WizardPhase::Reviewing => Ok(WizardPhase::Cancelled),
            _ => Err(self.invalid(WizardAction::Cancel)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardPhase::Done | WizardPhase::Cancelled)
    }

    fn invalid(self, action: WizardAction) -> WizardError {
        WizardError::InvalidTransition {
            phase: self,
            action,
        }
    }
}

impl fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardPhase::Collecting(step) => {
                write!(f, "collecting (step {}: {})", step.number(), step)
            }
            WizardPhase::Reviewing => write!(f, "reviewing"),
            WizardPhase::Committing => write!(f, "committing"),
            WizardPhase::Done => write!(f, "done"),
            WizardPhase::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A rendering engine template queued for registration with the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingEngineTemplateEntry {
    pub file_name: String,
    pub content: Vec<u8>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub output_path_pattern_for_rendition: String,
    pub mimetype_for_rendition: Option<String>,
    pub rendering_engine: RenderingEngine,
}

impl fmt::Display for RenderingEngineTemplateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{file_name: {}, mimetype_for_rendition: {}, output_path_pattern_for_rendition: {}, rendering_engine: {}}}",
            self.file_name,
            self.mimetype_for_rendition.as_deref().unwrap_or("-"),
            self.output_path_pattern_for_rendition,
            self.rendering_engine.name
        )
    }
}

/// Everything a user has entered into one run of the wizard
#[derive(Debug)]
pub struct FormSession {
    pub(crate) phase: WizardPhase,
    pub(crate) uploads: UploadStore,
    pub(crate) form_name: Option<String>,
    pub(crate) form_title: Option<String>,
    pub(crate) form_description: Option<String>,
    pub(crate) schema_root_element_name: Option<String>,
    pub(crate) output_path_pattern_for_form_instance_data: Option<String>,
    pub(crate) default_workflow_name: Option<String>,
    pub(crate) rendering_engine_template_title: Option<String>,
    pub(crate) rendering_engine_template_description: Option<String>,
    pub(crate) rendering_engine: Option<RenderingEngine>,
    pub(crate) output_path_pattern_for_rendition: Option<String>,
    pub(crate) mimetype_for_rendition: Option<String>,
    pub(crate) templates: Vec<RenderingEngineTemplateEntry>,
    pub(crate) selected_template: Option<usize>,
    pub(crate) messages: Vec<String>,
}

impl FormSession {
    pub fn new() -> Self {
        Self {
            phase: WizardPhase::Collecting(WizardStep::Details),
            uploads: UploadStore::new(),
            form_name: None,
            form_title: None,
            form_description: None,
            schema_root_element_name: None,
            output_path_pattern_for_form_instance_data: None,
            default_workflow_name: None,
            rendering_engine_template_title: None,
            rendering_engine_template_description: None,
            rendering_engine: None,
            output_path_pattern_for_rendition: None,
            mimetype_for_rendition: None,
            templates: Vec::new(),
            selected_template: None,
            messages: Vec::new(),
        }
    }

    /// Drop every entered value and upload, keeping the phase
    pub(crate) fn discard(&mut self) {
        let phase = self.phase;
        *self = Self::new();
        self.phase = phase;
    }

    /// Reset the fields that describe the next template entry
    pub(crate) fn clear_template_fields(&mut self) {
        self.uploads.clear(UploadSlot::RenderingEngineTemplate);
        self.rendering_engine = None;
        self.output_path_pattern_for_rendition = None;
        self.mimetype_for_rendition = None;
        self.rendering_engine_template_title = None;
        self.rendering_engine_template_description = None;
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    /// User-facing error messages reported during this session
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub(crate) fn report_error(&mut self, message: String) {
        self.messages.push(message);
    }

    // ------------------------------------------------------------------
    // Uploads

    pub fn schema_file(&self) -> Option<&UploadedFile> {
        self.uploads.get(UploadSlot::Schema)
    }

    pub fn schema_file_name(&self) -> Option<&str> {
        self.uploads.file_name(UploadSlot::Schema)
    }

    pub fn rendering_engine_template_file(&self) -> Option<&UploadedFile> {
        self.uploads.get(UploadSlot::RenderingEngineTemplate)
    }

    pub fn rendering_engine_template_file_name(&self) -> Option<&str> {
        self.uploads.file_name(UploadSlot::RenderingEngineTemplate)
    }

    /// Whether the "add to list" action is unavailable
    pub fn add_to_list_disabled(&self) -> bool {
        self.rendering_engine_template_file_name().is_none()
    }

    // ------------------------------------------------------------------
    // Form fields

    /// The form name, defaulting to the schema file name without extension
    pub fn form_name(&self) -> Option<String> {
        self.form_name
            .clone()
            .or_else(|| self.schema_file_name().map(strip_extension))
    }

    pub fn set_form_name(&mut self, form_name: Option<String>) {
        self.form_name = non_empty(form_name);
    }

    /// The form title, defaulting to the schema file name without extension
    pub fn form_title(&self) -> Option<String> {
        self.form_title
            .clone()
            .or_else(|| self.schema_file_name().map(strip_extension))
    }

    pub fn set_form_title(&mut self, form_title: Option<String>) {
        self.form_title = non_empty(form_title);
    }

    pub fn form_description(&self) -> Option<&str> {
        self.form_description.as_deref()
    }

    pub fn set_form_description(&mut self, form_description: Option<String>) {
        self.form_description = non_empty(form_description);
    }

    pub fn schema_root_element_name(&self) -> Option<&str> {
        self.schema_root_element_name.as_deref()
    }

    pub fn set_schema_root_element_name(&mut self, name: Option<String>) {
        self.schema_root_element_name = non_empty(name);
    }

    pub fn output_path_pattern_for_form_instance_data(&self) -> &str {
        self.output_path_pattern_for_form_instance_data
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_PATH_PATTERN_FORM_INSTANCE_DATA)
    }

    pub fn set_output_path_pattern_for_form_instance_data(&mut self, pattern: Option<String>) {
        self.output_path_pattern_for_form_instance_data = non_empty(pattern);
    }

    /// The selected workflow name, or the "none" selection value
    pub fn default_workflow_name(&self) -> &str {
        self.default_workflow_name
            .as_deref()
            .unwrap_or(NO_DEFAULT_WORKFLOW_SELECTED)
    }

    /// Select a default workflow; the "none" selection value clears it
    pub fn set_default_workflow_name(&mut self, name: &str) {
        self.default_workflow_name = if name == NO_DEFAULT_WORKFLOW_SELECTED {
            None
        } else {
            non_empty(Some(name.to_string()))
        };
    }

    pub(crate) fn selected_workflow_name(&self) -> Option<&str> {
        self.default_workflow_name.as_deref()
    }

    // ------------------------------------------------------------------
    // Fields of the template entry being prepared

    /// The template title, defaulting to the template file name without extension
    pub fn rendering_engine_template_title(&self) -> Option<String> {
        self.rendering_engine_template_title.clone().or_else(|| {
            self.rendering_engine_template_file_name()
                .map(strip_extension)
        })
    }

    pub fn set_rendering_engine_template_title(&mut self, title: Option<String>) {
        self.rendering_engine_template_title = non_empty(title);
    }

    pub fn rendering_engine_template_description(&self) -> Option<&str> {
        self.rendering_engine_template_description.as_deref()
    }

    pub fn set_rendering_engine_template_description(&mut self, description: Option<String>) {
        self.rendering_engine_template_description = non_empty(description);
    }

    pub fn output_path_pattern_for_rendition(&self) -> &str {
        self.output_path_pattern_for_rendition
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_PATH_PATTERN_RENDITION)
    }

    pub fn set_output_path_pattern_for_rendition(&mut self, pattern: Option<String>) {
        self.output_path_pattern_for_rendition = non_empty(pattern);
    }

    pub fn set_mimetype_for_rendition(&mut self, mimetype: Option<String>) {
        self.mimetype_for_rendition = non_empty(mimetype);
    }

    // ------------------------------------------------------------------
    // Template list

    /// Queued template entries, in the order they were added
    pub fn rendering_engine_templates(&self) -> &[RenderingEngineTemplateEntry] {
        &self.templates
    }

    pub fn selected_template(&self) -> Option<usize> {
        self.selected_template
    }

    /// Select a row of the template list; returns false when out of range
    pub fn select_template(&mut self, index: usize) -> bool {
        if index < self.templates.len() {
            self.selected_template = Some(index);
            true
        } else {
            false
        }
    }
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the last extension of a file name (`a.b.xsd` -> `a.b`)
///
/// Names without a dot after their first character are returned unchanged.
pub fn strip_extension(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name[..idx].to_string(),
        _ => file_name.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
