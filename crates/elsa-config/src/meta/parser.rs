//! Parser for meta configuration token streams.
//!
//! Grammar:
//!
//! ```text
//! meta       := invocation*
//! invocation := PROVIDER_NAME '(' args? ')'
//! args       := arg (','? arg)*
//! arg        := STRING | NUMBER
//! ```
//!
//! Whitespace tokens are ignored. An empty argument list is accepted here;
//! providers that need arguments reject it when they are constructed.

use std::fmt;

use super::error::{MetaError, MetaResult};
use super::lexer::{Token, TokenKind, lex};

/// One provider call from a meta string, e.g. `file('base')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInvocation {
    pub provider: Token,
    pub arguments: Vec<Token>,
}

impl ProviderInvocation {
    pub fn name(&self) -> &str {
        &self.provider.value
    }
}

/// Renders the invocation back in meta syntax: `aws-secret('elsa', 2)`.
impl fmt::Display for ProviderInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name())?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match arg.kind {
                TokenKind::String => write!(f, "'{}'", arg.value)?,
                _ => write!(f, "{}", arg.value)?,
            }
        }
        write!(f, ")")
    }
}

/// Lex and parse a meta configuration string in one step.
///
/// ```
/// use elsa_config::meta::parse_meta;
///
/// let invocations = parse_meta("file('base') file('dev-localhost')").unwrap();
/// assert_eq!(invocations.len(), 2);
/// assert_eq!(invocations[1].to_string(), "file('dev-localhost')");
/// ```
pub fn parse_meta(input: &str) -> MetaResult<Vec<ProviderInvocation>> {
    parse(&lex(input)?)
}

/// Group tokens into provider invocations, in source order.
pub fn parse(tokens: &[Token]) -> MetaResult<Vec<ProviderInvocation>> {
    let mut invocations = Vec::new();
    let mut provider: Option<&Token> = None;
    let mut arguments: Option<Vec<Token>> = None;
    // A comma that still waits for the argument after it.
    let mut pending_separator: Option<&Token> = None;

    for token in tokens {
        match token.kind {
            TokenKind::Whitespace => {}
            TokenKind::ProviderName => {
                if let Some(open) = provider {
                    return Err(MetaError::ProviderNotClosed {
                        provider: open.value.clone(),
                        position: token.position,
                    });
                }
                provider = Some(token);
            }
            TokenKind::LParen => {
                if provider.is_none() {
                    return Err(MetaError::ArgumentsWithoutProvider {
                        position: token.position,
                    });
                }
                if arguments.is_some() {
                    return Err(MetaError::ArgumentsAlreadyStarted {
                        position: token.position,
                    });
                }
                arguments = Some(Vec::new());
            }
            TokenKind::RParen => {
                let Some(open) = provider else {
                    return Err(MetaError::CloseWithoutProvider {
                        position: token.position,
                    });
                };
                let Some(args) = arguments.take() else {
                    return Err(MetaError::CloseWithoutArguments {
                        provider: open.value.clone(),
                        position: token.position,
                    });
                };
                if let Some(separator) = pending_separator {
                    return Err(MetaError::MisplacedSeparator {
                        position: separator.position,
                    });
                }
                invocations.push(ProviderInvocation {
                    provider: open.clone(),
                    arguments: args,
                });
                provider = None;
            }
            TokenKind::String | TokenKind::Number => {
                let Some(args) = arguments.as_mut() else {
                    return Err(MetaError::ArgumentOutsideList {
                        text: token.text.clone(),
                        position: token.position,
                    });
                };
                args.push(token.clone());
                pending_separator = None;
            }
            TokenKind::Comma => {
                let leading = arguments.as_ref().is_none_or(|args| args.is_empty());
                if leading || pending_separator.is_some() {
                    return Err(MetaError::MisplacedSeparator {
                        position: token.position,
                    });
                }
                pending_separator = Some(token);
            }
        }
    }

    if let Some(open) = provider {
        if arguments.is_some() {
            return Err(MetaError::UnterminatedArguments {
                provider: open.value.clone(),
                position: open.position,
            });
        }
        return Err(MetaError::UnterminatedProvider {
            provider: open.value.clone(),
            position: open.position,
        });
    }

    Ok(invocations)
}
