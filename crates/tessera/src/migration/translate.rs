//! Translation of formula expressions into macro text.
//!
//! Adapters decide which cells they accept by the top-level shape of the
//! expression; the operands below it may be any supported construct, so
//! all of them share this translator.

use crate::migration::{
    TransformationError,
    expr::{BinaryOp, CellRef, Expr},
    formula::Cell,
    layout::{WorkbookLayout, column_index, column_name},
};

/// Upper bound of cells a `SUM` range may expand to
pub const MAX_RANGE_CELLS: usize = 1000;

/// Characters with a meaning inside macro arguments
const ARGUMENT_SPECIALS: [char; 7] = [',', '(', ')', '\'', '\\', '#', '$'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateBase {
    Today,
    Now,
}

impl DateBase {
    fn pattern(self) -> &'static str {
        match self {
            DateBase::Today => "yyyy-MM-dd",
            DateBase::Now => "yyyy-MM-dd HH:mm:ss",
        }
    }
}

/// Translates the expressions of one cell.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Translator<'a> {
    cell: &'a Cell,
    layout: &'a WorkbookLayout,
}

impl<'a> Translator<'a> {
    pub fn new(cell: &'a Cell, layout: &'a WorkbookLayout) -> Self {
        Self { cell, layout }
    }

    /// Macro text of `expr` used as a macro argument.
    pub fn translate(&self, expr: &Expr) -> Result<String, TransformationError> {
        match expr {
            Expr::Text(text) => Ok(escape_argument(text)),
            Expr::Number(value) => Ok(render_number(*value)),
            Expr::Negate(operand) => match operand.as_ref() {
                Expr::Number(value) => Ok(render_number(-value)),
                _ => Err(TransformationError::Unsupported(
                    "negation of a non-numeric operand".to_string(),
                )),
            },
            Expr::Reference(target) => self.reference(target),
            Expr::Range { .. } => Err(TransformationError::Unsupported(
                "a range outside of SUM".to_string(),
            )),
            Expr::Binary {
                op: BinaryOp::Concat,
                ..
            } => self.concatenate(expr),
            Expr::Binary { left, .. } if is_date(left) => self.date(expr),
            Expr::Binary {
                op: BinaryOp::Add,
                left,
                right,
            } => Ok(format!(
                "#SUM({},{})",
                self.translate(left)?,
                self.translate(right)?
            )),
            Expr::Binary {
                op: BinaryOp::Subtract,
                left,
                right,
            } => match right.as_ref() {
                Expr::Number(value) => Ok(format!(
                    "#SUM({},{})",
                    self.translate(left)?,
                    render_number(-value)
                )),
                _ => Err(TransformationError::Unsupported(
                    "subtraction of a non-numeric operand".to_string(),
                )),
            },
            Expr::Call { name, .. } => match name.as_str() {
                "TODAY" | "NOW" | "TEXT" => self.date(expr),
                "RANDBETWEEN" => self.random_between(expr),
                "CONCATENATE" | "CONCAT" => self.concatenate(expr),
                "SUM" => self.sum(expr),
                "UUID" | "GUID" => self.uuid(expr),
                _ => Err(TransformationError::Unsupported(format!("function {name}"))),
            },
        }
    }

    pub fn reference(&self, target: &CellRef) -> Result<String, TransformationError> {
        check_row(target)?;
        self.layout.reference(self.cell.location(), target)
    }

    /// `TODAY()`, `NOW()`, either plus or minus whole days, optionally
    /// wrapped in `TEXT(value, "format")`.
    pub fn date(&self, expr: &Expr) -> Result<String, TransformationError> {
        let (pattern, offset) = match expr {
            Expr::Call { name, args } if name == "TEXT" => match args.as_slice() {
                [value, Expr::Text(format)] => (excel_date_pattern(format)?, date_value(value)?.1),
                [_, _] => {
                    return Err(TransformationError::Unsupported(
                        "TEXT with a computed format".to_string(),
                    ));
                }
                _ => return Err(arity_error("TEXT", 2, args.len())),
            },
            _ => {
                let (base, offset) = date_value(expr)?;
                (base.pattern().to_string(), offset)
            }
        };

        Ok(match offset {
            Some(days) => format!("#DATE({pattern},{days:+}d)"),
            None => format!("#DATE({pattern})"),
        })
    }

    pub fn random_between(&self, expr: &Expr) -> Result<String, TransformationError> {
        match call_args(expr) {
            [min, max] => Ok(format!(
                "#RANDOM_BETWEEN({},{})",
                self.translate(min)?,
                self.translate(max)?
            )),
            args => Err(arity_error("RANDBETWEEN", 2, args.len())),
        }
    }

    /// `CONCATENATE(...)` or a chain of `&`, flattened into one `CONCAT`.
    pub fn concatenate(&self, expr: &Expr) -> Result<String, TransformationError> {
        let mut parts = Vec::new();
        collect_concat_operands(expr, &mut parts);
        let parts = parts
            .into_iter()
            .map(|part| self.translate(part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("#CONCAT({})", parts.join(",")))
    }

    /// `SUM(...)` with ranges expanded to one reference per cell.
    pub fn sum(&self, expr: &Expr) -> Result<String, TransformationError> {
        let mut terms = Vec::new();
        for arg in call_args(expr) {
            match arg {
                Expr::Range { start, end } => {
                    for target in expand_range(start, end)? {
                        terms.push(self.reference(&target)?);
                    }
                }
                other => terms.push(self.translate(other)?),
            }
        }
        if terms.is_empty() {
            return Err(arity_error("SUM", 1, 0));
        }
        Ok(format!("#SUM({})", terms.join(",")))
    }

    pub fn uuid(&self, expr: &Expr) -> Result<String, TransformationError> {
        match call_args(expr) {
            [] => Ok("#UUID()".to_string()),
            args => Err(arity_error("UUID", 0, args.len())),
        }
    }
}

/// Whether `expr` evaluates to a date.
pub(crate) fn is_date(expr: &Expr) -> bool {
    match expr {
        Expr::Call { name, .. } => matches!(name.as_str(), "TODAY" | "NOW" | "TEXT"),
        Expr::Binary {
            op: BinaryOp::Add | BinaryOp::Subtract,
            left,
            ..
        } => is_date(left),
        _ => false,
    }
}

fn date_value(expr: &Expr) -> Result<(DateBase, Option<i64>), TransformationError> {
    match expr {
        Expr::Call { name, args } if args.is_empty() && name == "TODAY" => {
            Ok((DateBase::Today, None))
        }
        Expr::Call { name, args } if args.is_empty() && name == "NOW" => Ok((DateBase::Now, None)),
        Expr::Binary { op, left, right } if *op != BinaryOp::Concat => {
            let (base, offset) = date_value(left)?;
            let days = whole_days(right)?;
            let days = if *op == BinaryOp::Subtract { -days } else { days };
            Ok((base, Some(offset.unwrap_or(0) + days)))
        }
        _ => Err(TransformationError::Unsupported(
            "date expression other than TODAY() or NOW() plus days".to_string(),
        )),
    }
}

fn whole_days(expr: &Expr) -> Result<i64, TransformationError> {
    match expr {
        Expr::Number(value) if value.fract() == 0.0 && value.abs() < 1e9 => Ok(*value as i64),
        Expr::Negate(operand) => whole_days(operand).map(|days| -days),
        _ => Err(TransformationError::Unsupported(
            "date offset other than whole days".to_string(),
        )),
    }
}

fn call_args(expr: &Expr) -> &[Expr] {
    match expr {
        Expr::Call { args, .. } => args,
        _ => &[],
    }
}

fn collect_concat_operands<'e>(expr: &'e Expr, parts: &mut Vec<&'e Expr>) {
    match expr {
        Expr::Binary {
            op: BinaryOp::Concat,
            left,
            right,
        } => {
            collect_concat_operands(left, parts);
            collect_concat_operands(right, parts);
        }
        Expr::Call { name, args } if name == "CONCATENATE" || name == "CONCAT" => {
            for arg in args {
                collect_concat_operands(arg, parts);
            }
        }
        other => parts.push(other),
    }
}

/// Rows are numbered from 1.
fn check_row(target: &CellRef) -> Result<(), TransformationError> {
    if target.row() == 0 {
        return Err(TransformationError::InvalidFormat(format!(
            "row 0 in cell reference {target}"
        )));
    }
    Ok(())
}

fn expand_range(start: &CellRef, end: &CellRef) -> Result<Vec<CellRef>, TransformationError> {
    check_row(start)?;
    check_row(end)?;
    let (first_row, last_row) = (start.row().min(end.row()), start.row().max(end.row()));
    let (first_column, last_column) = {
        let (a, b) = (column_index(start.column()), column_index(end.column()));
        (a.min(b), a.max(b))
    };

    let cells = (u64::from(last_row - first_row) + 1)
        .checked_mul(u64::from(last_column - first_column) + 1)
        .unwrap_or(u64::MAX);
    let within_limit = usize::try_from(cells).is_ok_and(|cells| cells <= MAX_RANGE_CELLS);
    if !within_limit {
        return Err(TransformationError::RangeTooLarge {
            range: format!("{start}:{}{}", end.column(), end.row()),
            cells,
        });
    }

    let sheet = start.sheet().map(str::to_string);
    let mut targets = Vec::new();
    for column in first_column..=last_column {
        for row in first_row..=last_row {
            targets.push(CellRef::new(sheet.clone(), column_name(column), row));
        }
    }
    Ok(targets)
}

fn arity_error(function: &str, expected: usize, found: usize) -> TransformationError {
    TransformationError::InvalidFormat(format!(
        "{function} takes {expected} argument(s), got {found}"
    ))
}

/// Escape characters that would otherwise split or start something inside
/// a macro argument.
pub(crate) fn escape_argument(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if ARGUMENT_SPECIALS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn render_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FormatToken {
    Field(char, usize),
    AmPm,
    Literal(String),
}

/// Translate a spreadsheet number format (`yyyy-mm-dd hh:mm`) into a
/// `DATE` pattern, ready to be used as a macro argument.
///
/// `m` means minutes right after an hour field or right before a seconds
/// field, months otherwise. Literal letters are quoted, with the quotes
/// escaped for the macro argument.
pub(crate) fn excel_date_pattern(format: &str) -> Result<String, TransformationError> {
    let tokens = tokenize_format(format)?;
    let twelve_hour = tokens.contains(&FormatToken::AmPm);
    let fields: Vec<Option<char>> = tokens
        .iter()
        .map(|token| match token {
            FormatToken::Field(letter, _) => Some(*letter),
            _ => None,
        })
        .collect();

    let mut pattern = String::new();
    for (index, token) in tokens.iter().enumerate() {
        match token {
            FormatToken::Literal(text) => push_pattern_literal(&mut pattern, text),
            FormatToken::AmPm => pattern.push('a'),
            FormatToken::Field(letter, count) => {
                let previous = fields[..index].iter().rev().find_map(|field| *field);
                let next = fields[index + 1..].iter().find_map(|field| *field);
                let field = match (*letter, *count) {
                    ('y', 1..=2) => "yy",
                    ('y', _) => "yyyy",
                    ('m', n) if previous == Some('h') || next == Some('s') => {
                        if n == 1 { "m" } else { "mm" }
                    }
                    ('m', 1) => "M",
                    ('m', 2) => "MM",
                    ('m', 3) => "MMM",
                    ('m', _) => "MMMM",
                    ('d', 1) => "d",
                    ('d', 2) => "dd",
                    ('d', 3) => "EEE",
                    ('d', _) => "EEEE",
                    ('h', 1) if twelve_hour => "h",
                    ('h', _) if twelve_hour => "hh",
                    ('h', 1) => "H",
                    ('h', _) => "HH",
                    ('s', 1) => "s",
                    ('s', _) => "ss",
                    (letter, _) => {
                        return Err(TransformationError::InvalidFormat(format!(
                            "unsupported format letter `{letter}` in `{format}`"
                        )));
                    }
                };
                pattern.push_str(field);
            }
        }
    }
    Ok(pattern)
}

fn tokenize_format(format: &str) -> Result<Vec<FormatToken>, TransformationError> {
    let mut tokens: Vec<FormatToken> = Vec::new();
    let mut rest = format;

    while let Some(c) = rest.chars().next() {
        let upper = rest.to_ascii_uppercase();
        if upper.starts_with("AM/PM") {
            tokens.push(FormatToken::AmPm);
            rest = &rest[5..];
        } else if upper.starts_with("A/P") {
            tokens.push(FormatToken::AmPm);
            rest = &rest[3..];
        } else if c == '"' {
            let end = rest[1..].find('"').ok_or_else(|| {
                TransformationError::InvalidFormat(format!("unterminated quote in `{format}`"))
            })?;
            push_literal(&mut tokens, &rest[1..1 + end]);
            rest = &rest[end + 2..];
        } else if c == '\\' {
            let escaped = rest[1..].chars().next().ok_or_else(|| {
                TransformationError::InvalidFormat(format!("dangling escape in `{format}`"))
            })?;
            push_literal(&mut tokens, &rest[1..1 + escaped.len_utf8()]);
            rest = &rest[1 + escaped.len_utf8()..];
        } else if matches!(c.to_ascii_lowercase(), 'y' | 'm' | 'd' | 'h' | 's') {
            let letter = c.to_ascii_lowercase();
            let count = rest
                .chars()
                .take_while(|next| next.to_ascii_lowercase() == letter)
                .count();
            tokens.push(FormatToken::Field(letter, count));
            rest = &rest[count..];
        } else {
            push_literal(&mut tokens, &rest[..c.len_utf8()]);
            rest = &rest[c.len_utf8()..];
        }
    }
    Ok(tokens)
}

/// Extend the trailing literal token, or start one.
fn push_literal(tokens: &mut Vec<FormatToken>, text: &str) {
    match tokens.last_mut() {
        Some(FormatToken::Literal(literal)) => literal.push_str(text),
        _ => tokens.push(FormatToken::Literal(text.to_string())),
    }
}

/// Append literal text to a `DATE` pattern used as a macro argument.
fn push_pattern_literal(pattern: &mut String, text: &str) {
    let mut quoted = false;
    for c in text.chars() {
        if c.is_ascii_alphabetic() != quoted {
            pattern.push_str(r"\'");
            quoted = !quoted;
        }
        match c {
            '\'' => pattern.push_str(r"\'\'"),
            c if ARGUMENT_SPECIALS.contains(&c) => {
                pattern.push('\\');
                pattern.push(c);
            }
            c => pattern.push(c),
        }
    }
    if quoted {
        pattern.push_str(r"\'");
    }
}
