use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A post was built without any videos in its carousel.
    EmptyCarousel,
    /// A source locator could not be parsed as an absolute URL.
    InvalidLocator(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::EmptyCarousel => {
                write!(f, "post must carry at least one video")
            }
            ModelError::InvalidLocator(msg) => {
                write!(f, "invalid source locator: {msg}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl From<url::ParseError> for ModelError {
    fn from(err: url::ParseError) -> Self {
        ModelError::InvalidLocator(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
