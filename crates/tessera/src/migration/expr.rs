//! Spreadsheet formula expressions.
//!
//! Covers the subset of formula syntax found in legacy test data: string
//! and number literals, cell references with optional sheet and `$`
//! markers, ranges, function calls, `+`, `-`, `&` and parentheses.

use std::fmt;

use winnow::{
    ModalResult, Parser,
    ascii::{digit1, multispace0},
    combinator::{alt, delimited, not, opt, preceded, repeat, separated, terminated},
    error::{ContextError, ErrMode},
    token::{none_of, one_of, take_while},
};

/// A cell address such as `Sheet2!$B$3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRef {
    sheet: Option<String>,
    column: String,
    row: u32,
}

impl CellRef {
    pub fn new(sheet: Option<String>, column: impl Into<String>, row: u32) -> Self {
        Self {
            sheet,
            column: column.into().to_ascii_uppercase(),
            row,
        }
    }

    /// The sheet named in the reference; `None` means the formula's own sheet.
    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    /// Upper-case column letters
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn row(&self) -> u32 {
        self.row
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "{sheet}!")?;
        }
        write!(f, "{}{}", self.column, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Concat,
}

/// A parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Text(String),
    Number(f64),
    Reference(CellRef),
    Range { start: CellRef, end: CellRef },
    /// Function name is upper-cased
    Call { name: String, args: Vec<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
}

impl Expr {
    /// Whether this is a call of `name` (upper case).
    pub fn is_call(&self, name: &str) -> bool {
        matches!(self, Expr::Call { name: called, .. } if called == name)
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Parse formula text, including the leading `=`.
pub fn parse_formula(text: &str) -> Result<Expr, String> {
    formula.parse(text).map_err(|err| err.to_string())
}

fn formula(input: &mut &str) -> ModalResult<Expr> {
    preceded((multispace0, '='), terminated(expr, multispace0)).parse_next(input)
}

fn expr(input: &mut &str) -> ModalResult<Expr> {
    concatenation(input)
}

fn ws<'i, O>(
    parser: impl Parser<&'i str, O, ErrMode<ContextError>>,
) -> impl Parser<&'i str, O, ErrMode<ContextError>> {
    delimited(multispace0, parser, multispace0)
}

fn concatenation(input: &mut &str) -> ModalResult<Expr> {
    let first = additive(input)?;
    let rest: Vec<Expr> = repeat(0.., preceded(ws('&'), additive)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |left, right| Expr::binary(BinaryOp::Concat, left, right)))
}

fn additive(input: &mut &str) -> ModalResult<Expr> {
    let first = unary(input)?;
    let rest: Vec<(BinaryOp, Expr)> = repeat(
        0..,
        (
            ws(alt(('+'.value(BinaryOp::Add), '-'.value(BinaryOp::Subtract)))),
            unary,
        ),
    )
    .parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |left, (op, right)| Expr::binary(op, left, right)))
}

fn unary(input: &mut &str) -> ModalResult<Expr> {
    alt((
        preceded(ws('-'), unary).map(|operand| Expr::Negate(Box::new(operand))),
        ws(primary),
    ))
    .parse_next(input)
}

fn primary(input: &mut &str) -> ModalResult<Expr> {
    alt((
        string.map(Expr::Text),
        number.map(Expr::Number),
        reference,
        call,
        delimited('(', ws(expr), ')'),
    ))
    .parse_next(input)
}

/// `"text"` with `""` standing for one quote
fn string(input: &mut &str) -> ModalResult<String> {
    delimited(
        '"',
        repeat(0.., alt(("\"\"".value('"'), none_of('"')))),
        '"',
    )
    .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<f64> {
    (digit1, opt(('.', digit1)))
        .take()
        .parse_to()
        .parse_next(input)
}

fn name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic()),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
    )
        .take()
        .parse_next(input)
}

fn call(input: &mut &str) -> ModalResult<Expr> {
    let name = name(input)?;
    let args: Vec<Expr> =
        delimited(ws('('), separated(0.., expr, ws(',')), ws(')')).parse_next(input)?;
    Ok(Expr::Call {
        name: name.to_ascii_uppercase(),
        args,
    })
}

/// `'My Sheet'` with `''` standing for one quote
fn quoted_sheet(input: &mut &str) -> ModalResult<String> {
    delimited(
        '\'',
        repeat(1.., alt(("''".value('\''), none_of('\'')))),
        '\'',
    )
    .parse_next(input)
}

fn sheet_prefix(input: &mut &str) -> ModalResult<String> {
    terminated(alt((quoted_sheet, name.map(str::to_string))), '!').parse_next(input)
}

/// `$B$3`; must not be followed by anything that continues a name
fn cell_address(input: &mut &str) -> ModalResult<(String, u32)> {
    terminated(
        (
            preceded(opt('$'), take_while(1..=3, |c: char| c.is_ascii_alphabetic())),
            preceded(opt('$'), digit1.parse_to::<u32>()),
        ),
        not(one_of(|c: char| {
            c.is_ascii_alphanumeric() || matches!(c, '(' | '_' | '.' | '!')
        })),
    )
    .map(|(column, row): (&str, u32)| (column.to_string(), row))
    .parse_next(input)
}

fn reference(input: &mut &str) -> ModalResult<Expr> {
    let sheet = opt(sheet_prefix).parse_next(input)?;
    let (column, row) = cell_address(input)?;
    let end = opt(preceded(':', cell_address)).parse_next(input)?;

    let start = CellRef::new(sheet.clone(), column, row);
    Ok(match end {
        Some((column, row)) => Expr::Range {
            start,
            end: CellRef::new(sheet, column, row),
        },
        None => Expr::Reference(start),
    })
}
