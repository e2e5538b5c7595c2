use thiserror::Error;

/// Errors that can occur while building, serializing, or signing an NFS-e batch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NfseError {
    /// A required input field is absent. Carries the dot-separated field path
    /// (e.g. `rps[0].tomador.endereco.cep`).
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field is present but fails its format contract (digit length, enum
    /// membership, date grammar).
    #[error("invalid format in {field}: {message}")]
    InvalidFormat { field: String, message: String },

    /// One or more validation rules failed (joined messages).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A derived value contradicts another stated value beyond tolerance
    /// (e.g. ISS amount vs. base × rate).
    #[error("inconsistent computed value: {0}")]
    InconsistentValue(String),

    /// XML writing failure (buffer or encoding error while emitting events).
    #[error("XML error: {0}")]
    Xml(String),

    /// The serializer produced text that does not re-parse as well-formed
    /// XML. Internal-bug signal, always fatal.
    #[error("generated XML is malformed: {0}")]
    MalformedXml(String),

    /// The signing pass could not locate its target node.
    #[error("signature target not found: {0}")]
    SignatureTargetNotFound(String),

    /// The signing pass did not end with the expected signature count.
    #[error("document has {found} signature(s), expected {expected}")]
    IncompleteSignature { expected: usize, found: usize },

    /// Certificate loading or credential failure (external boundary).
    #[error("certificate error: {0}")]
    Certificate(String),

    /// The external XML-DSig primitive failed.
    #[error("signing error: {0}")]
    Signer(String),
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "rps[0].tomador.endereco.cep").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
    /// ABRASF schema element name if applicable (e.g. "tcCpfCnpj").
    pub rule: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "[{}] {}: {}", rule, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ValidationError {
    /// Create a validation error without a schema rule name.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Create a validation error tagged with an ABRASF schema element name.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}
