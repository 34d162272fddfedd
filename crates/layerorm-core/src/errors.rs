use thiserror::Error;

/// Result type alias using OrmError
pub type Result<T> = std::result::Result<T, OrmError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used in structured logs and by
/// callers that branch on failures without matching the full `OrmError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Row/Table validation
    Validation,
    IndexOutOfBounds,
    EmptyTable,
    KeyFieldUnset,
    AggregateKeyField,

    // Relations
    NotARelation,
    UnsupportedRelationKind,

    // Resolution
    ModelNotFound,
    MethodNotFound,

    // Collaborators
    SessionMissing,
    ExternalService,

    // Integration
    Config,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Validation => "ERR_VALIDATION",
            ExErrorKind::IndexOutOfBounds => "ERR_INDEX_OUT_OF_BOUNDS",
            ExErrorKind::EmptyTable => "ERR_EMPTY_TABLE",
            ExErrorKind::KeyFieldUnset => "ERR_KEY_FIELD_UNSET",
            ExErrorKind::AggregateKeyField => "ERR_AGGREGATE_KEY_FIELD",
            ExErrorKind::NotARelation => "ERR_NOT_A_RELATION",
            ExErrorKind::UnsupportedRelationKind => "ERR_UNSUPPORTED_RELATION_KIND",
            ExErrorKind::ModelNotFound => "ERR_MODEL_NOT_FOUND",
            ExErrorKind::MethodNotFound => "ERR_METHOD_NOT_FOUND",
            ExErrorKind::SessionMissing => "ERR_SESSION_MISSING",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether this kind is one of the hard failures that always reach the caller
    ///
    /// Relation misuse and name resolution misses are programming or wiring
    /// errors; every other kind degrades at some call site.
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            ExErrorKind::NotARelation
                | ExErrorKind::UnsupportedRelationKind
                | ExErrorKind::ModelNotFound
                | ExErrorKind::MethodNotFound
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus optional model/field/region context
/// for logging and external reporting.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    model: Option<String>,
    field: Option<String>,
    region: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            model: None,
            field: None,
            region: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add model name context
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add field name context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add region context
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(model) = &self.model {
            write!(f, " (model: {})", model)?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        if let Some(region) = &self.region {
            write!(f, " (region: {})", region)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for layerorm operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrmError {
    // ===== Validation Errors =====
    /// One or more rows carried fields outside the table's canonical field set
    #[error("{rejected} row(s) rejected: fields {fields:?} are not part of the table schema")]
    RowNotInSchema { fields: Vec<String>, rejected: usize },

    /// A row with no fields was offered where a record is required
    #[error("Row has no fields")]
    EmptyRow,

    /// Positional access outside the table
    #[error("Index {index} out of bounds for table of {len} row(s)")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Operation requires at least one row
    #[error("Table is empty: cannot {op}")]
    EmptyTable { op: String },

    /// Key indexing requested against a scalar aggregate result
    #[error("Field {field} does not resolve on a single-column aggregate result")]
    AggregateKeyField { field: String },

    /// Key lookup without a key field or a fallback
    #[error("No key field set and no default key field configured")]
    KeyFieldUnset,

    /// Layer declaration that cannot be registered
    #[error("Layer {layer} cannot be registered: {message}")]
    InvalidLayer { layer: String, message: String },

    // ===== Relation Errors =====
    /// Relation operation on a field that is not a relation field
    #[error("Field {field} on model {model} is not a relation field")]
    NotARelation { model: String, field: String },

    /// Relation kind without a registered fetch handler
    #[error("Relation kind {kind} on {model}.{field} has no handler")]
    UnsupportedRelationKind {
        model: String,
        field: String,
        kind: String,
    },

    // ===== Resolution Errors =====
    /// Model name (or its region) did not resolve to an implementing type
    #[error("Model not found: {model} (region: {region})")]
    ModelNotFound { model: String, region: String },

    /// Method name not recorded for the model
    #[error("Method {method} not found on model {model}")]
    MethodNotFound { model: String, method: String },

    // ===== Collaborator Errors =====
    /// Data operation on a layer with no attached session
    #[error("No session attached to model {model}")]
    SessionMissing { model: String },

    /// Failure reported by the session collaborator
    #[error("Session error: {message}")]
    Session { message: String },

    // ===== Generic Errors =====
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from OrmError to ExError
impl From<OrmError> for ExError {
    fn from(err: OrmError) -> Self {
        match err {
            OrmError::RowNotInSchema { fields, rejected } => {
                ExError::new(ExErrorKind::Validation).with_message(format!(
                    "{} row(s) rejected, unknown fields {:?}",
                    rejected, fields
                ))
            }

            OrmError::EmptyRow => {
                ExError::new(ExErrorKind::Validation).with_message("Row has no fields")
            }

            OrmError::InvalidLayer { layer, message } => ExError::new(ExErrorKind::Validation)
                .with_op("register")
                .with_message(format!("{}: {}", layer, message)),

            OrmError::IndexOutOfBounds { index, len } => {
                ExError::new(ExErrorKind::IndexOutOfBounds)
                    .with_message(format!("Index {} out of bounds (len {})", index, len))
            }

            OrmError::EmptyTable { op } => ExError::new(ExErrorKind::EmptyTable)
                .with_op(op)
                .with_message("Table is empty"),

            OrmError::AggregateKeyField { field } => ExError::new(ExErrorKind::AggregateKeyField)
                .with_op("set_key_field")
                .with_field(field)
                .with_message("Field does not resolve on aggregate result"),

            OrmError::KeyFieldUnset => ExError::new(ExErrorKind::KeyFieldUnset)
                .with_op("record_by_key")
                .with_message("No key field set"),

            OrmError::NotARelation { model, field } => ExError::new(ExErrorKind::NotARelation)
                .with_model(model)
                .with_field(field)
                .with_message("Not a relation field"),

            OrmError::UnsupportedRelationKind { model, field, kind } => {
                ExError::new(ExErrorKind::UnsupportedRelationKind)
                    .with_model(model)
                    .with_field(field)
                    .with_message(format!("Relation kind {} has no handler", kind))
            }

            OrmError::ModelNotFound { model, region } => ExError::new(ExErrorKind::ModelNotFound)
                .with_model(model)
                .with_region(region)
                .with_message("Model not found"),

            OrmError::MethodNotFound { model, method } => {
                ExError::new(ExErrorKind::MethodNotFound)
                    .with_model(model)
                    .with_message(format!("Method {} not found", method))
            }

            OrmError::SessionMissing { model } => ExError::new(ExErrorKind::SessionMissing)
                .with_model(model)
                .with_message("No session attached"),

            OrmError::Session { message } => {
                ExError::new(ExErrorKind::ExternalService).with_message(message)
            }

            OrmError::Config { message } => ExError::new(ExErrorKind::Config).with_message(message),

            OrmError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            OrmError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to OrmError
impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from toml::de::Error to OrmError
impl From<toml::de::Error> for OrmError {
    fn from(err: toml::de::Error) -> Self {
        OrmError::Config {
            message: err.to_string(),
        }
    }
}
