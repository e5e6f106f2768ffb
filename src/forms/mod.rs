//! XML form registration
//!
//! The wizard in [`wizard`] gathers a schema and its rendering engine
//! templates into a [`FormSession`], and [`commit`] writes the finished form
//! into a [`ContentRepository`](crate::core::ContentRepository).

pub mod commit;
pub mod engine;
pub mod registry;
pub mod schema;
pub mod session;
pub mod wizard;

pub use commit::{commit_form, CommittedForm, CommittedTemplate, FormCommit};
pub use engine::{RenderingEngine, RenderingEngineRegistry};
pub use registry::{find_form, list_forms, RegisteredForm, RegisteredTemplate};
pub use schema::{root_element_names, SchemaError};
pub use session::{FormSession, RenderingEngineTemplateEntry, WizardPhase, WizardStep};
pub use wizard::{CreateFormWizard, WizardAction, WizardError, WizardServices};
