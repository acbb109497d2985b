use thiserror::Error;

/// Common error type for model-level validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommonError {
    #[error("Duplicate component id: {0}")]
    DuplicateId(String),

    #[error("Component {id} uses reserved prop name {name}")]
    ReservedProp { id: String, name: String },
}

/// Common Result type alias
pub type CommonResult<T> = Result<T, CommonError>;
