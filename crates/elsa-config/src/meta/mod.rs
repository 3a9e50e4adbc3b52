//! Meta configuration strings.
//!
//! The meta string names the configuration sources to load and their order,
//! for example `file('base') file('dev-common') osx-keychain('elsa-data')`.
//! Later sources take priority over earlier ones.

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::{MetaError, MetaResult};
pub use lexer::{PROVIDER_NAMES, Position, Token, TokenKind, lex};
pub use parser::{ProviderInvocation, parse, parse_meta};
