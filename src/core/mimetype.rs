//! Mimetype lookup by file extension

/// Fallback when an extension is unknown
pub const MIMETYPE_BINARY: &str = "application/octet-stream";

/// (extension, mimetype, display label)
const MIMETYPES: &[(&str, &str, &str)] = &[
    ("xml", "text/xml", "XML"),
    ("xsd", "text/xml", "XML"),
    ("html", "text/html", "HTML"),
    ("htm", "text/html", "HTML"),
    ("xhtml", "application/xhtml+xml", "XHTML"),
    ("txt", "text/plain", "Plain Text"),
    ("css", "text/css", "Cascading Style Sheet"),
    ("csv", "text/csv", "Comma Separated Values"),
    ("js", "application/x-javascript", "JavaScript"),
    ("json", "application/json", "JSON"),
    ("pdf", "application/pdf", "Adobe PDF Document"),
    ("rtf", "application/rtf", "Rich Text Format"),
    ("ftl", "text/x-freemarker", "FreeMarker"),
    ("xsl", "text/xsl", "XSL"),
    ("xslt", "text/xsl", "XSL"),
    ("fo", "application/xsl-fo", "XSL-FO"),
    ("svg", "image/svg+xml", "Scalable Vector Graphics"),
    ("png", "image/png", "PNG Image"),
    ("jpg", "image/jpeg", "JPEG Image"),
    ("jpeg", "image/jpeg", "JPEG Image"),
    ("gif", "image/gif", "GIF Image"),
    ("zip", "application/zip", "ZIP"),
];

/// Guesses and lists mimetypes known to the repository
#[derive(Debug, Clone, Default)]
pub struct MimetypeMap;

impl MimetypeMap {
    pub fn new() -> Self {
        Self
    }

    /// Guess the mimetype of a file name or path pattern from its extension
    ///
    /// Unknown or missing extensions yield `application/octet-stream`.
    pub fn guess_mimetype(&self, file_name: &str) -> String {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .and_then(|ext| {
                MIMETYPES
                    .iter()
                    .find(|(e, _, _)| *e == ext)
                    .map(|(_, mimetype, _)| mimetype.to_string())
            })
            .unwrap_or_else(|| MIMETYPE_BINARY.to_string())
    }

    /// Display label for a mimetype, if known
    pub fn display(&self, mimetype: &str) -> Option<&'static str> {
        MIMETYPES
            .iter()
            .find(|(_, m, _)| *m == mimetype)
            .map(|(_, _, label)| *label)
    }

    /// Every known mimetype with its label, sorted case-insensitively by label
    pub fn choices(&self) -> Vec<(String, String)> {
        let mut choices: Vec<(String, String)> = Vec::new();
        for (_, mimetype, label) in MIMETYPES {
            if !choices.iter().any(|(m, _)| m == mimetype) {
                choices.push((mimetype.to_string(), label.to_string()));
            }
        }
        choices.push((MIMETYPE_BINARY.to_string(), "Binary File".to_string()));
        choices.sort_by_key(|(_, label)| label.to_lowercase());
        choices
    }
}
