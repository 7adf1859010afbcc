use std::fmt;

// Domain-level errors for token and group workflows.
#[derive(Debug, PartialEq, Eq)]
pub enum AccessError {
    InvalidToken,
    TokenExpired,
    StorageFailure,
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::InvalidToken => write!(f, "invalid access token"),
            AccessError::TokenExpired => write!(f, "access token expired"),
            AccessError::StorageFailure => write!(f, "token storage unavailable"),
        }
    }
}

impl std::error::Error for AccessError {}

// Rejections reported back to a client inside an `ack` frame.
#[derive(Debug, PartialEq, Eq)]
pub enum GroupError {
    Forbidden,
    InvalidGroup,
}

impl GroupError {
    // Short code carried in the ack `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            GroupError::Forbidden => "Forbidden",
            GroupError::InvalidGroup => "InvalidRequest",
        }
    }
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::error::Error for GroupError {}
