use petstore_core_types::RequestId;
use thiserror::Error;

/// Result type alias using PetStoreError
pub type Result<T> = std::result::Result<T, PetStoreError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on
/// programmatically, independent of the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Caller contract
    InvalidInput,
    NotFound,

    // Graph consistency
    InvariantViolation,
    IdentityMisuse,

    // Storage contents
    IntegrityViolation,
    Codec,

    // Integration/IO
    Persistence,
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            ExErrorKind::IdentityMisuse => "ERR_IDENTITY_MISUSE",
            ExErrorKind::IntegrityViolation => "ERR_INTEGRITY_VIOLATION",
            ExErrorKind::Codec => "ERR_CODEC",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification plus the context needed to say which
/// entity or table caused the failure.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    table: Option<String>,
    request_id: Option<RequestId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            table: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add table context
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
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

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
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
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(table) = &self.table {
            write!(f, " (table: {})", table)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for graph, mapping and persistence operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PetStoreError {
    // ===== Caller Contract =====
    /// A key that does not belong to this graph
    #[error("{entity} is not part of this graph")]
    EntityNotFound { entity: String },

    /// Field value rejected at construction
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // ===== Graph Consistency =====
    /// Bidirectional association found out of sync
    #[error("Invariant violated on {entity}: {reason}")]
    InvariantViolation { entity: String, reason: String },

    // ===== Identity Misuse =====
    /// Attempt to give an identified entity a different identity
    #[error("{entity} already has identity {existing}; refusing to reassign {attempted}")]
    IdentityAlreadyAssigned {
        entity: String,
        existing: i64,
        attempted: i64,
    },

    /// Identity already bound to another entity of the same kind
    #[error("Identity {id} is already held by {holder}; cannot bind it to {entity}")]
    DuplicateIdentity {
        entity: String,
        holder: String,
        id: i64,
    },

    /// Backend issued a key lower than one issued earlier in the same call
    #[error("Identity {attempted} for {entity} is lower than {last} issued earlier in this call")]
    NonMonotonicIdentity {
        entity: String,
        last: i64,
        attempted: i64,
    },

    /// A table name that is not a registered animal variant
    #[error("Unknown animal variant table '{table}'")]
    UnknownVariant { table: String },

    // ===== Integrity =====
    /// Zero or several variant rows for one animal base row
    #[error("Animal {animal_id} matched {} variant rows (expected exactly one): {matches:?}", .matches.len())]
    VariantMismatch { animal_id: i64, matches: Vec<String> },

    /// Foreign key pointing at a row that does not exist
    #[error("{table}.{column} references missing {target} {id}")]
    DanglingReference {
        table: String,
        column: String,
        target: String,
        id: i64,
    },

    /// Row encoding needed an identity that has not been assigned yet
    #[error("{entity} references {target}, which has no identity yet")]
    UnresolvedReference { entity: String, target: String },

    // ===== Mapping =====
    /// Column missing or of the wrong type
    #[error("Column {table}.{column}: {reason}")]
    InvalidColumn {
        table: String,
        column: String,
        reason: String,
    },

    /// Enumerated value with no known code
    #[error("Unknown {category} code '{code}'")]
    Codec { category: String, code: String },

    // ===== Writes =====
    /// The backend rejected a row during a cascade
    #[error("Writing {entity} to table {table} failed: {reason}")]
    WriteFailed {
        entity: String,
        table: String,
        reason: String,
    },

    /// Transaction control or read failure in the backend
    #[error("Storage backend error during {op}: {message}")]
    Backend { op: String, message: String },

    // ===== Generic Errors =====
    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from PetStoreError to ExError
impl From<PetStoreError> for ExError {
    fn from(err: PetStoreError) -> Self {
        let message = err.to_string();
        match err {
            PetStoreError::EntityNotFound { entity } => ExError::new(ExErrorKind::NotFound)
                .with_entity(entity)
                .with_message(message),

            PetStoreError::InvalidInput { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }

            PetStoreError::InvariantViolation { entity, .. } => {
                ExError::new(ExErrorKind::InvariantViolation)
                    .with_entity(entity)
                    .with_message(message)
            }

            PetStoreError::IdentityAlreadyAssigned { entity, .. }
            | PetStoreError::DuplicateIdentity { entity, .. }
            | PetStoreError::NonMonotonicIdentity { entity, .. } => {
                ExError::new(ExErrorKind::IdentityMisuse)
                    .with_entity(entity)
                    .with_message(message)
            }

            PetStoreError::UnknownVariant { table } => ExError::new(ExErrorKind::IdentityMisuse)
                .with_table(table)
                .with_message(message),

            PetStoreError::VariantMismatch { animal_id, .. } => {
                ExError::new(ExErrorKind::IntegrityViolation)
                    .with_entity(format!("animal #{}", animal_id))
                    .with_table("animal")
                    .with_message(message)
            }

            PetStoreError::DanglingReference { table, .. } => {
                ExError::new(ExErrorKind::IntegrityViolation)
                    .with_table(table)
                    .with_message(message)
            }

            PetStoreError::UnresolvedReference { entity, .. } => {
                ExError::new(ExErrorKind::Internal)
                    .with_entity(entity)
                    .with_message(message)
            }

            PetStoreError::InvalidColumn { table, .. } => {
                ExError::new(ExErrorKind::IntegrityViolation)
                    .with_table(table)
                    .with_message(message)
            }

            PetStoreError::Codec { .. } => ExError::new(ExErrorKind::Codec).with_message(message),

            PetStoreError::WriteFailed { entity, table, .. } => {
                ExError::new(ExErrorKind::Persistence)
                    .with_entity(entity)
                    .with_table(table)
                    .with_message(message)
            }

            PetStoreError::Backend { op, .. } => ExError::new(ExErrorKind::Persistence)
                .with_op(op)
                .with_message(message),

            PetStoreError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}
