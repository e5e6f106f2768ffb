//! TFM: Tessera Forms
//!
//! Registers XML forms (an XML Schema plus the rendering engine templates
//! that turn instance documents into renditions) in a content repository
//! kept as plain files next to a YAML index.

pub mod cli;
pub mod core;
pub mod forms;
