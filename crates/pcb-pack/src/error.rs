use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackError {
    #[error("Degenerate geometry: {reason}")]
    GeometryDegenerate { reason: String },

    #[error("No valid placement found for component '{component_id}'")]
    NoValidPlacement { component_id: String },

    #[error("Component '{component_id}' does not fit inside the bounds")]
    OutOfBounds { component_id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Solver did not finish within {limit} iterations")]
    IterationLimit { limit: usize },
}

impl PackError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        PackError::GeometryDegenerate {
            reason: reason.into(),
        }
    }

    /// The component that could not be placed, if the failure names one.
    pub fn component_id(&self) -> Option<&str> {
        match self {
            PackError::NoValidPlacement { component_id }
            | PackError::OutOfBounds { component_id } => Some(component_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PackError>;
