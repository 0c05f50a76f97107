use std::borrow::Cow;
use std::path::Path;

use thiserror::Error;

/// Kernel source with named placeholders.
///
/// Placeholders are written `{name}`; literal braces are escaped by doubling them (`{{`, `}}`).
/// Substitution happens in a single pass, inserted text is never scanned for placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: Cow<'static, str>,
}

/// Errors raised while instantiating a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A field was provided but the template has no placeholder for it.
    #[error("Template is missing the placeholder `{{{name}}}`")]
    MissingPlaceholder {
        /// The name of the expected placeholder.
        name: String,
    },

    /// The template has a placeholder no field was provided for.
    #[error("Template has an unknown placeholder `{{{name}}}` at byte {offset}")]
    UnknownPlaceholder {
        /// The name of the placeholder.
        name: String,
        /// Byte offset of the opening brace.
        offset: usize,
    },

    /// A brace is neither escaped nor part of a placeholder.
    #[error("Template has an unmatched brace at byte {offset}")]
    UnmatchedBrace {
        /// Byte offset of the brace.
        offset: usize,
    },
}

impl Template {
    /// Create a template from its text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Cow::Owned(text.into()),
        }
    }

    /// The bundled shared memory tiled matmul kernel.
    ///
    /// Placeholders: `real` (element type), `fzero` (zero literal), `TW` (tile width) and
    /// `loop` (inner product over one tile). The entry point is `matmul`.
    pub fn tiled_matmul() -> Self {
        Self {
            text: Cow::Borrowed(include_str!("matmul.cu")),
        }
    }

    /// Read a template from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        std::fs::read_to_string(path).map(Self::new)
    }

    /// The raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute every placeholder with its field value.
    ///
    /// Fails if a placeholder has no field, if a field has no placeholder or on any stray brace.
    /// No partial output is returned.
    pub fn render(&self, fields: &[(&str, &str)]) -> Result<String, TemplateError> {
        let text = self.text.as_ref();
        let mut output = String::with_capacity(text.len());
        let mut used = vec![false; fields.len()];
        let mut rest = text;
        let mut offset = 0;

        while let Some(pos) = rest.find(['{', '}']) {
            output.push_str(&rest[..pos]);

            let brace = rest.as_bytes()[pos];
            let after = &rest[pos + 1..];
            let consumed = if after.as_bytes().first() == Some(&brace) {
                output.push(brace as char);
                pos + 2
            } else if brace == b'}' {
                return Err(TemplateError::UnmatchedBrace {
                    offset: offset + pos,
                });
            } else {
                let end = match after.find(['{', '}']) {
                    Some(end) if after.as_bytes()[end] == b'}' => end,
                    _ => {
                        return Err(TemplateError::UnmatchedBrace {
                            offset: offset + pos,
                        })
                    }
                };
                let name = &after[..end];
                let index = fields
                    .iter()
                    .position(|(field, _)| *field == name)
                    .ok_or_else(|| TemplateError::UnknownPlaceholder {
                        name: name.to_string(),
                        offset: offset + pos,
                    })?;

                output.push_str(fields[index].1);
                used[index] = true;
                pos + end + 2
            };

            rest = &rest[consumed..];
            offset += consumed;
        }
        output.push_str(rest);

        if let Some(index) = used.iter().position(|used| !used) {
            return Err(TemplateError::MissingPlaceholder {
                name: fields[index].0.to_string(),
            });
        }

        Ok(output)
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::tiled_matmul()
    }
}
