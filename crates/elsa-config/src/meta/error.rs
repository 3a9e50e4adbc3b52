use thiserror::Error;

use super::lexer::Position;

/// Errors raised while lexing or parsing a meta configuration string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    #[error("unexpected character '{found}' at {position}")]
    UnexpectedCharacter { found: char, position: Position },

    #[error("unknown configuration provider '{name}' at {position}")]
    UnknownProvider { name: String, position: Position },

    #[error("string starting at {position} is not terminated")]
    UnterminatedString { position: Position },

    #[error("invalid escape '\\{escape}' at {position} (only \\' and \\\\ are allowed)")]
    InvalidEscape { escape: char, position: Position },

    #[error("invalid number '{text}' at {position}: {reason}")]
    InvalidNumber {
        text: String,
        reason: &'static str,
        position: Position,
    },

    #[error("provider '{provider}' must have its arguments closed before another provider at {position}")]
    ProviderNotClosed { provider: String, position: Position },

    #[error("argument list at {position} does not follow a provider name")]
    ArgumentsWithoutProvider { position: Position },

    #[error("argument list at {position} opened while another is already open")]
    ArgumentsAlreadyStarted { position: Position },

    #[error("closing parenthesis at {position} does not follow a provider")]
    CloseWithoutProvider { position: Position },

    #[error("closing parenthesis at {position} has no open argument list for '{provider}'")]
    CloseWithoutArguments { provider: String, position: Position },

    #[error("argument {text} at {position} is outside of a provider argument list")]
    ArgumentOutsideList { text: String, position: Position },

    #[error("separator at {position} must sit between two arguments")]
    MisplacedSeparator { position: Position },

    #[error("provider '{provider}' at {position} has no argument list")]
    UnterminatedProvider { provider: String, position: Position },

    #[error("argument list of '{provider}' at {position} is never closed")]
    UnterminatedArguments { provider: String, position: Position },
}

impl MetaError {
    /// Position of the offending token (or of the provider for errors
    /// detected at end of input).
    pub fn position(&self) -> Position {
        match self {
            MetaError::UnexpectedCharacter { position, .. }
            | MetaError::UnknownProvider { position, .. }
            | MetaError::UnterminatedString { position }
            | MetaError::InvalidEscape { position, .. }
            | MetaError::InvalidNumber { position, .. }
            | MetaError::ProviderNotClosed { position, .. }
            | MetaError::ArgumentsWithoutProvider { position }
            | MetaError::ArgumentsAlreadyStarted { position }
            | MetaError::CloseWithoutProvider { position }
            | MetaError::CloseWithoutArguments { position, .. }
            | MetaError::ArgumentOutsideList { position, .. }
            | MetaError::MisplacedSeparator { position }
            | MetaError::UnterminatedProvider { position, .. }
            | MetaError::UnterminatedArguments { position, .. } => *position,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            MetaError::UnexpectedCharacter { .. } => "E-1-1",
            MetaError::UnknownProvider { .. } => "E-1-2",
            MetaError::UnterminatedString { .. } => "E-1-3",
            MetaError::InvalidEscape { .. } => "E-1-4",
            MetaError::InvalidNumber { .. } => "E-1-5",
            MetaError::ProviderNotClosed { .. } => "E-1-10",
            MetaError::ArgumentsWithoutProvider { .. } => "E-1-11",
            MetaError::ArgumentsAlreadyStarted { .. } => "E-1-12",
            MetaError::CloseWithoutProvider { .. } => "E-1-13",
            MetaError::CloseWithoutArguments { .. } => "E-1-14",
            MetaError::ArgumentOutsideList { .. } => "E-1-15",
            MetaError::MisplacedSeparator { .. } => "E-1-16",
            MetaError::UnterminatedProvider { .. } | MetaError::UnterminatedArguments { .. } => {
                "E-1-17"
            }
        }
    }
}

pub type MetaResult<T> = Result<T, MetaError>;
