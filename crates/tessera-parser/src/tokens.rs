use std::fmt;

use crate::span::Span;

/// Token types of the macro language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'src> {
    /// Plain text, emitted verbatim. Inside arguments the quotes of a quoted
    /// run and the backslash of an escape are not part of the text.
    Literal(&'src str),
    /// Macro sentinel (`#` or `$`)
    MacroStart(char),
    /// Macro name following a sentinel
    Ident(&'src str),
    ArgSep, // ,
    Open,   // (
    Close,  // )
}

/// The payload-free discriminant of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Literal,
    MacroStart,
    Ident,
    ArgSep,
    Open,
    Close,
}

impl Token<'_> {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Literal(_) => TokenKind::Literal,
            Token::MacroStart(_) => TokenKind::MacroStart,
            Token::Ident(_) => TokenKind::Ident,
            Token::ArgSep => TokenKind::ArgSep,
            Token::Open => TokenKind::Open,
            Token::Close => TokenKind::Close,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(text) => write!(f, "{text}"),
            Token::MacroStart(sigil) => write!(f, "{sigil}"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::ArgSep => write!(f, ","),
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
        }
    }
}

/// A token with position information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self { token, span }
    }
}

impl<'src> std::ops::Deref for PositionedToken<'src> {
    type Target = Token<'src>;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl fmt::Display for PositionedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.token, self.span)
    }
}
