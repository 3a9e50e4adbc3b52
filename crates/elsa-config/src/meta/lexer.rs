//! Tokenizer for meta configuration strings.
//!
//! A meta string such as `file('base') file('dev') aws-secret('elsa/prod')`
//! lists configuration sources in priority order. The lexer turns it into a
//! flat token list; [`super::parser`] gives the tokens structure.

use std::fmt;

use super::error::{MetaError, MetaResult};

/// The closed set of provider names the lexer accepts.
pub const PROVIDER_NAMES: [&str; 5] = [
    "aws-secret",
    "gcloud-secret",
    "file",
    "osx-keychain",
    "linux-pass",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Whitespace,
    Number,
    String,
    LParen,
    RParen,
    Comma,
    ProviderName,
}

/// Where a token starts in the input.
///
/// `offset` is a byte offset; `line` and `column` are 1-based and count
/// characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source text, quotes included.
    pub text: String,
    /// The decoded value: unquoted and unescaped for strings.
    pub value: String,
    pub position: Position,
    /// Number of newlines inside the token (only whitespace can have any).
    pub line_breaks: usize,
}

impl Token {
    /// Byte range of the token in the input.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.position.offset..self.position.offset + self.text.len()
    }
}

/// Tokenize a meta configuration string.
///
/// ```
/// use elsa_config::meta::{lex, TokenKind};
///
/// let tokens = lex("file('base')").unwrap();
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![TokenKind::ProviderName, TokenKind::LParen, TokenKind::String, TokenKind::RParen]
/// );
/// assert_eq!(tokens[2].value, "base");
/// ```
pub fn lex(input: &str) -> MetaResult<Vec<Token>> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    input: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn position(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn run(mut self) -> MetaResult<Vec<Token>> {
        while let Some(c) = self.peek() {
            let start = self.position();
            match c {
                c if c.is_whitespace() => self.whitespace(start),
                '(' => self.single(TokenKind::LParen, start),
                ')' => self.single(TokenKind::RParen, start),
                ',' => self.single(TokenKind::Comma, start),
                '\'' => self.string(start)?,
                '0'..='9' => self.number(start)?,
                c if c.is_ascii_alphabetic() => self.provider_name(start)?,
                found => return Err(MetaError::UnexpectedCharacter { found, position: start }),
            }
        }
        Ok(self.tokens)
    }

    fn push(&mut self, kind: TokenKind, start: Position, value: String, line_breaks: usize) {
        let text = self.input[start.offset..self.offset].to_string();
        self.tokens.push(Token {
            kind,
            text,
            value,
            position: start,
            line_breaks,
        });
    }

    /// Advance over a run of characters on the current line.
    fn advance_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        let taken = &rest[..len];
        self.offset += len;
        self.column += taken.chars().count();
        taken
    }

    fn whitespace(&mut self, start: Position) {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(rest.len());
        let run = &rest[..len];
        let line_breaks = run.matches('\n').count();
        self.offset += len;
        if line_breaks > 0 {
            self.line += line_breaks;
            let after_last_break = run.rsplit('\n').next().unwrap_or("");
            self.column = after_last_break.chars().count() + 1;
        } else {
            self.column += run.chars().count();
        }
        self.push(TokenKind::Whitespace, start, run.to_string(), line_breaks);
    }

    fn single(&mut self, kind: TokenKind, start: Position) {
        self.offset += 1;
        self.column += 1;
        let value = self.input[start.offset..self.offset].to_string();
        self.push(kind, start, value, 0);
    }

    fn number(&mut self, start: Position) -> MetaResult<()> {
        let digits = self.advance_while(|c| c.is_ascii_digit());
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(MetaError::InvalidNumber {
                text: digits.to_string(),
                reason: "leading zeros are not allowed",
                position: start,
            });
        }
        if digits.parse::<u64>().is_err() {
            return Err(MetaError::InvalidNumber {
                text: digits.to_string(),
                reason: "too large",
                position: start,
            });
        }
        self.push(TokenKind::Number, start, digits.to_string(), 0);
        Ok(())
    }

    fn provider_name(&mut self, start: Position) -> MetaResult<()> {
        let name = self.advance_while(|c| c.is_ascii_alphanumeric() || c == '-');
        if !PROVIDER_NAMES.contains(&name) {
            return Err(MetaError::UnknownProvider {
                name: name.to_string(),
                position: start,
            });
        }
        self.push(TokenKind::ProviderName, start, name.to_string(), 0);
        Ok(())
    }

    fn string(&mut self, start: Position) -> MetaResult<()> {
        // opening quote
        self.offset += 1;
        self.column += 1;
        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(MetaError::UnterminatedString { position: start });
            };
            match c {
                '\n' => return Err(MetaError::UnterminatedString { position: start }),
                '\'' => {
                    self.offset += 1;
                    self.column += 1;
                    break;
                }
                '\\' => {
                    let escape_at = self.position();
                    self.offset += 1;
                    self.column += 1;
                    match self.peek() {
                        Some(escaped @ ('\'' | '\\')) => {
                            value.push(escaped);
                            self.offset += 1;
                            self.column += 1;
                        }
                        Some('\n') | None => {
                            return Err(MetaError::UnterminatedString { position: start });
                        }
                        Some(other) => {
                            return Err(MetaError::InvalidEscape {
                                escape: other,
                                position: escape_at,
                            });
                        }
                    }
                }
                other => {
                    value.push(other);
                    self.offset += other.len_utf8();
                    self.column += 1;
                }
            }
        }
        self.push(TokenKind::String, start, value, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_full_meta_string() {
        use TokenKind::*;
        assert_eq!(
            kinds("file('base') aws-secret('elsa/prod', 3)"),
            vec![
                ProviderName, LParen, String, RParen, Whitespace, ProviderName, LParen, String,
                Comma, Whitespace, Number, RParen
            ]
        );
    }

    #[test]
    fn test_lex_is_lossless() {
        for input in [
            "file('base') file('dev-common')",
            "  aws-secret( 'a\\'b' ,  12 )\n\tlinux-pass('elsa/dev')  ",
            "gcloud-secret('x',1,2)osx-keychain('elsa-data')",
        ] {
            let rebuilt: String = lex(input).unwrap().iter().map(|t| t.text.as_str()).collect();
            assert_eq!(rebuilt, input);
        }
    }

    #[test]
    fn test_lex_positions_across_lines() {
        let tokens = lex("file('a')\n  file('b')").unwrap();
        let ws = &tokens[4];
        assert_eq!(ws.kind, TokenKind::Whitespace);
        assert_eq!(ws.line_breaks, 1);
        let second = &tokens[5];
        assert_eq!(second.value, "file");
        assert_eq!(second.position, Position { offset: 12, line: 2, column: 3 });
    }

    #[test]
    fn test_lex_string_escapes() {
        let tokens = lex(r"'it\'s a \\ path'").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, r"it's a \ path");
        assert_eq!(tokens[0].text, r"'it\'s a \\ path'");
        assert_eq!(tokens[0].range(), 0..17);
    }

    #[test]
    fn test_lex_columns_count_characters() {
        let tokens = lex("'é' (").unwrap();
        assert_eq!(tokens[0].value, "é");
        assert_eq!(tokens[2].position, Position { offset: 5, line: 1, column: 5 });
    }

    #[test]
    fn test_lex_rejects_unknown_provider() {
        let err = lex("file('a') s3-bucket('b')").unwrap_err();
        assert_eq!(
            err,
            MetaError::UnknownProvider {
                name: "s3-bucket".into(),
                position: Position { offset: 10, line: 1, column: 11 },
            }
        );
    }

    #[test]
    fn test_lex_rejects_unterminated_string() {
        assert!(matches!(
            lex("file('base"),
            Err(MetaError::UnterminatedString { position }) if position.column == 6
        ));
        assert!(matches!(
            lex("file('ba\nse')"),
            Err(MetaError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn test_lex_rejects_unknown_escape() {
        assert!(matches!(
            lex(r"'a\nb'"),
            Err(MetaError::InvalidEscape { escape: 'n', position }) if position.offset == 2
        ));
    }

    #[test]
    fn test_lex_numbers() {
        let tokens = lex("0 42").unwrap();
        assert_eq!(tokens[0].value, "0");
        assert_eq!(tokens[2].value, "42");
        assert!(matches!(lex("007"), Err(MetaError::InvalidNumber { .. })));
        assert!(matches!(
            lex("99999999999999999999999"),
            Err(MetaError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_lex_rejects_stray_characters() {
        assert_eq!(
            lex("file(\"x\")").unwrap_err(),
            MetaError::UnexpectedCharacter {
                found: '"',
                position: Position { offset: 5, line: 1, column: 6 },
            }
        );
    }

    #[test]
    fn test_lex_empty_input() {
        assert!(lex("").unwrap().is_empty());
    }
}
