//! `DATE(pattern, offset...)`.
//!
//! Patterns use the letters of `java.text.SimpleDateFormat`, which is what
//! stored test data was written against. They are translated to `strftime`
//! before formatting. Offsets are signed amounts with a unit, several per
//! argument: `+1y-2d`, `-3h`, `10m`.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Months, TimeDelta};
use winnow::{
    ModalResult, Parser,
    ascii::{digit1, space0},
    combinator::{delimited, opt, repeat},
    token::one_of,
};

use crate::eval::{
    evaluator::Scope,
    registry::{Arity, Macro, MacroError},
};

/// Current date and time, shifted by offsets and formatted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Date;

impl Macro for Date {
    fn name(&self) -> &str {
        "DATE"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(1)
    }

    fn call(&self, args: &[String], scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
        let format = strftime_pattern(&args[0])?;

        let mut date = scope.now();
        for offset in &args[1..] {
            for (amount, unit) in parse_offsets(offset)? {
                date = shift(date, amount, unit).ok_or_else(|| {
                    MacroError::invalid_argument(format!("date offset `{}` is out of range", offset.trim()))
                })?;
            }
        }

        let mut output = String::new();
        write!(output, "{}", date.format(&format)).map_err(|_| {
            MacroError::invalid_argument(format!("cannot format date with `{}`", args[0]))
        })?;
        Ok(output)
    }
}

/// Translate a Java date pattern to a `strftime` format string.
fn strftime_pattern(pattern: &str) -> Result<String, MacroError> {
    let mut format = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    format.push('\'');
                    continue;
                }
                // Quoted literal, `''` inside it is one quote
                loop {
                    match chars.next() {
                        Some('\'') if chars.peek() == Some(&'\'') => {
                            chars.next();
                            format.push('\'');
                        }
                        Some('\'') => break,
                        Some(literal) => push_literal(&mut format, literal),
                        None => {
                            return Err(MacroError::invalid_argument(format!(
                                "unterminated quote in date pattern `{pattern}`"
                            )));
                        }
                    }
                }
            }
            letter if letter.is_ascii_alphabetic() => {
                let mut run = 1;
                while chars.peek() == Some(&letter) {
                    chars.next();
                    run += 1;
                }
                format.push_str(field(letter, run).ok_or_else(|| {
                    MacroError::invalid_argument(format!(
                        "unsupported date pattern letter `{letter}` in `{pattern}`"
                    ))
                })?);
            }
            literal => push_literal(&mut format, literal),
        }
    }
    Ok(format)
}

fn push_literal(format: &mut String, c: char) {
    if c == '%' {
        format.push_str("%%");
    } else {
        format.push(c);
    }
}

/// `strftime` specifier of a run of `count` pattern letters.
fn field(letter: char, count: usize) -> Option<&'static str> {
    let specifier = match (letter, count) {
        ('y', 2) => "%y",
        ('y', _) => "%Y",
        ('M', 1) => "%-m",
        ('M', 2) => "%m",
        ('M', 3) => "%b",
        ('M', _) => "%B",
        ('d', 1) => "%-d",
        ('d', _) => "%d",
        ('H', 1) => "%-H",
        ('H', _) => "%H",
        ('h', 1) => "%-I",
        ('h', _) => "%I",
        ('m', 1) => "%-M",
        ('m', _) => "%M",
        ('s', 1) => "%-S",
        ('s', _) => "%S",
        ('S', 1..=3) => "%3f",
        ('S', 4..=6) => "%6f",
        ('S', _) => "%9f",
        ('a', _) => "%p",
        ('E', 1..=3) => "%a",
        ('E', _) => "%A",
        ('D', _) => "%j",
        ('u', _) => "%u",
        ('Z', _) => "%z",
        ('X', _) => "%:z",
        _ => return None,
    };
    Some(specifier)
}

fn offset_term(input: &mut &str) -> ModalResult<(i64, char)> {
    (
        opt(one_of(['+', '-'])),
        digit1.parse_to::<i64>(),
        one_of(['y', 'M', 'w', 'd', 'h', 'm', 's']),
    )
        .map(|(sign, amount, unit)| (if sign == Some('-') { -amount } else { amount }, unit))
        .parse_next(input)
}

/// Parse `+1y-2d` style offsets. A blank argument has no offsets.
fn parse_offsets(text: &str) -> Result<Vec<(i64, char)>, MacroError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    repeat(1.., delimited(space0, offset_term, space0))
        .parse(text)
        .map_err(|_| MacroError::invalid_argument(format!("invalid date offset `{}`", text.trim())))
}

fn shift(date: DateTime<FixedOffset>, amount: i64, unit: char) -> Option<DateTime<FixedOffset>> {
    let delta = match unit {
        'y' | 'M' => {
            let months = if unit == 'y' { amount.checked_mul(12)? } else { amount };
            let step = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
            return if months >= 0 {
                date.checked_add_months(step)
            } else {
                date.checked_sub_months(step)
            };
        }
        'w' => TimeDelta::try_weeks(amount)?,
        'd' => TimeDelta::try_days(amount)?,
        'h' => TimeDelta::try_hours(amount)?,
        'm' => TimeDelta::try_minutes(amount)?,
        's' => TimeDelta::try_seconds(amount)?,
        _ => return None,
    };
    date.checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::builtins::test_support::evaluate;

    #[test]
    fn test_pattern_translation() {
        assert_eq!(strftime_pattern("yyyy-MM-dd").expect("valid"), "%Y-%m-%d");
        assert_eq!(strftime_pattern("d.M.yy").expect("valid"), "%-d.%-m.%y");
        assert_eq!(strftime_pattern("HH:mm:ss.SSS").expect("valid"), "%H:%M:%S.%3f");
        assert_eq!(strftime_pattern("100%").expect("valid"), "100%%");
    }

    #[test]
    fn test_quoted_literals() {
        assert_eq!(strftime_pattern("yyyy'T'").expect("valid"), "%YT");
        assert_eq!(strftime_pattern("'at' HH").expect("valid"), "at %H");
        assert_eq!(strftime_pattern("hh 'o''clock'").expect("valid"), "%I o'clock");
        assert_eq!(strftime_pattern("''").expect("valid"), "'");
        assert!(strftime_pattern("'open").is_err());
    }

    #[test]
    fn test_unsupported_letter() {
        let err = strftime_pattern("yyyy-qq").expect_err("q is not a field");
        assert!(matches!(err, MacroError::InvalidArgument(_)));
    }

    #[test]
    fn test_parse_offsets() {
        assert_eq!(parse_offsets("+1y-2d").expect("valid"), [(1, 'y'), (-2, 'd')]);
        assert_eq!(parse_offsets(" 3h ").expect("valid"), [(3, 'h')]);
        assert_eq!(parse_offsets("-1M +2w").expect("valid"), [(-1, 'M'), (2, 'w')]);
        assert!(parse_offsets("   ").expect("valid").is_empty());
        assert!(parse_offsets("+1x").is_err());
        assert!(parse_offsets("tomorrow").is_err());
    }

    #[test]
    fn test_date_formats_clock_time() {
        assert_eq!(evaluate("#DATE(yyyy-MM-dd)"), "2024-02-29");
        assert_eq!(evaluate("#DATE(HH:mm:ss.SSS Z)"), "13:45:07.123 +0100");
        assert_eq!(evaluate("#DATE(EEE EEEE MMM MMMM)"), "Thu Thursday Feb February");
        assert_eq!(evaluate("#DATE(hh a)"), "01 PM");
    }

    #[test]
    fn test_date_with_escaped_quotes() {
        assert_eq!(
            evaluate(r"#DATE(yyyy-MM-dd\'T\'HH:mm:ss\'Z\')"),
            "2024-02-29T13:45:07Z"
        );
    }

    #[test]
    fn test_date_offsets() {
        assert_eq!(evaluate("#DATE(yyyy-MM-dd, +1d)"), "2024-03-01");
        assert_eq!(evaluate("#DATE(yyyy-MM-dd,+1y)"), "2025-02-28");
        assert_eq!(evaluate("#DATE(yyyy-MM-dd,-1M)"), "2024-01-29");
        assert_eq!(evaluate("#DATE(yyyy-MM-dd,+1w,-2d)"), "2024-03-05");
        assert_eq!(evaluate("#DATE(HH:mm,+1h-15m)"), "14:30");
        assert_eq!(evaluate("#DATE(yyyy,)"), "2024");
    }

    #[test]
    fn test_date_errors_render_inline() {
        assert!(evaluate("#DATE(qqq)").starts_with("[ERROR: invalid argument:"));
        assert!(evaluate("#DATE(yyyy, soon)").contains("invalid date offset `soon`"));
        assert!(evaluate("#DATE()").starts_with("[ERROR:"));
    }
}
