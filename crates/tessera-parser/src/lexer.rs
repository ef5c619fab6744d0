//! Lexical analyzer for macro text.
//!
//! The lexer converts stored text into a lazy stream of [`Token`]s. It is
//! context sensitive: outside a macro call everything except a macro start
//! is plain text, while inside an argument list commas, parentheses, quotes
//! and backslash escapes are significant.
//!
//! The lexer never fails. Unbalanced parentheses and unterminated calls are
//! emitted optimistically and left to the parser, which degrades them to
//! plain text.

use winnow::{
    Parser as _,
    combinator::{alt, delimited, peek, preceded, terminated},
    error::{ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{one_of, take, take_while},
};

use crate::{
    span::Span,
    tokens::{PositionedToken, Token},
};

/// Characters that introduce a macro call.
pub const SIGILS: [char; 2] = ['#', '$'];

/// Characters with a meaning of their own inside an argument list.
const ARGUMENT_SPECIALS: [char; 5] = [',', '(', ')', '\'', '\\'];

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError>;

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse a macro sentinel that is directly followed by an identifier start
fn macro_start<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    terminated(one_of(SIGILS), peek(one_of(is_ident_start)))
        .map(Token::MacroStart)
        .parse_next(input)
}

/// Parse a macro name
fn identifier<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., is_ident_char)
        .verify(|s: &str| s.chars().next().is_some_and(is_ident_start))
        .map(Token::Ident)
        .parse_next(input)
}

fn open<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    '('.value(Token::Open).parse_next(input)
}

fn close<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    ')'.value(Token::Close).parse_next(input)
}

fn arg_sep<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    ','.value(Token::ArgSep).parse_next(input)
}

/// Parse a single-quoted run: the content is taken verbatim without the quotes
fn quoted<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    delimited('\'', take_while(0.., |c: char| c != '\''), '\'')
        .map(Token::Literal)
        .parse_next(input)
}

/// Parse a backslash escape: the escaped character is plain text
fn escaped<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded('\\', take(1usize))
        .map(Token::Literal)
        .parse_next(input)
}

/// Length in bytes of the plain-text run at the start of `rest`.
fn literal_run_len(rest: &str, in_arguments: bool) -> usize {
    let mut chars = rest.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        let starts_macro =
            SIGILS.contains(&c) && chars.peek().is_some_and(|(_, next)| is_ident_start(*next));
        if starts_macro || (in_arguments && ARGUMENT_SPECIALS.contains(&c)) {
            return offset;
        }
    }
    rest.len()
}

fn literal_run<'a>(input: &mut Input<'a>, in_arguments: bool) -> IResult<Token<'a>> {
    let rest = input.peek_slice(input.eof_offset());
    match literal_run_len(rest, in_arguments) {
        0 => Err(ErrMode::Backtrack(ContextError::new())),
        len => Ok(Token::Literal(input.next_slice(len))),
    }
}

fn text_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    literal_run(input, false)
}

fn argument_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    literal_run(input, true)
}

/// Any single character as plain text; the fallback of every mode
fn single_char<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take(1usize).map(Token::Literal).parse_next(input)
}

/// Lazy, restartable tokenizer over one input string.
///
/// The iterator is finite and yields tokens left to right. Cloning a lexer
/// (or calling [`Lexer::restart`]) produces an independent cursor.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    source: &'src str,
    input: Input<'src>,
    /// Nesting depth of argument lists; zero means plain text mode.
    depth: usize,
    after_sigil: bool,
    after_ident: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            input: LocatingSlice::new(source),
            depth: 0,
            after_sigil: false,
            after_ident: false,
        }
    }

    /// A fresh lexer positioned at the start of the same source.
    pub fn restart(&self) -> Self {
        Self::new(self.source)
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    fn next_token(&mut self) -> IResult<Token<'src>> {
        let input = &mut self.input;
        if self.after_sigil {
            return identifier.parse_next(input);
        }
        match (self.depth, self.after_ident) {
            (0, true) => alt((open, macro_start, text_literal, single_char)).parse_next(input),
            (0, false) => alt((macro_start, text_literal, single_char)).parse_next(input),
            _ => alt((
                open,
                close,
                arg_sep,
                quoted,
                escaped,
                macro_start,
                argument_literal,
                single_char,
            ))
            .parse_next(input),
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = PositionedToken<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.input.eof_offset() == 0 {
            return None;
        }

        let start = self.input.current_token_start();
        let token = self.next_token().ok()?;
        let end = self.input.current_token_start();

        self.after_sigil = matches!(token, Token::MacroStart(_));
        self.after_ident = matches!(token, Token::Ident(_));
        match token {
            Token::Open => self.depth += 1,
            Token::Close => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }

        Some(PositionedToken::new(token, Span::new(start..end)))
    }
}

/// Tokenize a whole input string.
pub fn tokenize(input: &str) -> Vec<PositionedToken<'_>> {
    Lexer::new(input).collect()
}
