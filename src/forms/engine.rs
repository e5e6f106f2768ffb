//! Rendering engines that turn form instance data into renditions

use serde::Serialize;
use std::fmt;

/// Describes a rendering engine and the template files it accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderingEngine {
    pub name: &'static str,
    /// Template file extensions, lowercase and without the dot
    pub extensions: &'static [&'static str],
}

impl RenderingEngine {
    /// Whether a template file name carries one of this engine's extensions
    pub fn accepts(&self, file_name: &str) -> bool {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext.as_str()))
    }
}

impl fmt::Display for RenderingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub const FREEMARKER: RenderingEngine = RenderingEngine {
    name: "FreeMarker",
    extensions: &["ftl"],
};

pub const XSLT: RenderingEngine = RenderingEngine {
    name: "XSLT",
    extensions: &["xsl", "xslt"],
};

pub const XSL_FO: RenderingEngine = RenderingEngine {
    name: "XSL-FO",
    extensions: &["fo"],
};

/// The set of rendering engines available to forms
#[derive(Debug, Clone)]
pub struct RenderingEngineRegistry {
    engines: Vec<RenderingEngine>,
}

impl RenderingEngineRegistry {
    pub fn new(engines: Vec<RenderingEngine>) -> Self {
        Self { engines }
    }

    pub fn engines(&self) -> &[RenderingEngine] {
        &self.engines
    }

    /// Look up an engine by name (case-insensitive)
    pub fn rendering_engine(&self, name: &str) -> Option<RenderingEngine> {
        self.engines
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .copied()
    }

    /// Pick the engine for a template from its file extension
    pub fn guess_rendering_engine(&self, file_name: &str) -> Option<RenderingEngine> {
        self.engines.iter().find(|e| e.accepts(file_name)).copied()
    }

    /// Engine names for a selection list
    pub fn rendering_engine_choices(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.name).collect()
    }
}

impl Default for RenderingEngineRegistry {
    fn default() -> Self {
        Self::new(vec![FREEMARKER, XSLT, XSL_FO])
    }
}
