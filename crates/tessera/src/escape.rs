//! Quote escaping inside `DATE` macros.
//!
//! Date patterns quote literal letters, as in `yyyy-MM-dd'T'HH:mm:ss'Z'`.
//! Inside macro arguments a bare `'` starts a quoted run, so the quotes
//! around `T` and `Z` must be written `\'`. [`DateMacroEscaper`] rewrites
//! both plain and half-escaped forms, leaving text outside date macros
//! untouched. Escaping an already escaped text changes nothing.

use log::debug;
use regex::Regex;

/// One `DATE` macro located in a text; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMacros {
    start: usize,
    end: usize,
    text: String,
}

impl DateMacros {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// The macro source, sigil to closing parenthesis.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Finds `DATE` macros and escapes the `'T'`/`'Z'` quotes inside them.
#[derive(Debug, Clone)]
pub struct DateMacroEscaper {
    date_start: Regex,
    quoted_letter: Regex,
}

impl DateMacroEscaper {
    /// # Errors
    ///
    /// Fails only if the built-in patterns do not compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            date_start: Regex::new(r"[#$]DATE\(")?,
            quoted_letter: Regex::new(r"(\\)?'([TZ])(\\)?'")?,
        })
    }

    /// Every complete `DATE` macro in `input`, in order.
    ///
    /// A macro ends at the parenthesis that balances its opening one;
    /// backslash-escaped characters and quoted runs do not count.
    /// Unterminated macros are skipped, as are macros nested in an earlier one.
    pub fn find_date_macros(&self, input: &str) -> Vec<DateMacros> {
        let mut macros: Vec<DateMacros> = Vec::new();
        for found in self.date_start.find_iter(input) {
            if macros.last().is_some_and(|last| found.start() < last.end) {
                continue;
            }
            if let Some(end) = closing_paren(input, found.end()) {
                macros.push(DateMacros {
                    start: found.start(),
                    end,
                    text: input[found.start()..end].to_string(),
                });
            }
        }
        macros
    }

    /// Escape `'T'` and `'Z'` inside every `DATE` macro of `input`.
    pub fn escape_date_quotes(&self, input: &str) -> String {
        let macros = self.find_date_macros(input);
        let mut output = input.to_string();
        let mut delta: isize = 0;
        let mut rewritten = 0;

        for date in &macros {
            let escaped = self
                .quoted_letter
                .replace_all(date.text(), r"\'${2}\'");
            if escaped == date.text() {
                continue;
            }

            let start = date.start.saturating_add_signed(delta);
            let end = date.end.saturating_add_signed(delta);
            output.replace_range(start..end, &escaped);
            delta += escaped.len() as isize - date.text.len() as isize;
            rewritten += 1;
        }

        if rewritten > 0 {
            debug!(macros = macros.len(), rewritten; "Escaped date macro quotes");
        }
        output
    }
}

/// Byte offset just past the `)` balancing an already consumed `(`.
///
/// Parentheses inside a `'...'` run are literal; a quote with no partner is
/// ordinary text.
fn closing_paren(input: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut chars = input.get(from..)?.char_indices();
    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '\'' => {
                let mut run = chars.clone();
                if run.any(|(_, c)| c == '\'') {
                    chars = run;
                }
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaper() -> DateMacroEscaper {
        DateMacroEscaper::new().expect("valid patterns")
    }

    #[test]
    fn test_escapes_quotes_in_date_macro() {
        assert_eq!(
            escaper().escape_date_quotes("Value: #DATE(yyyy-MM-dd'T'HH:mm:ss'Z')"),
            r"Value: #DATE(yyyy-MM-dd\'T\'HH:mm:ss\'Z\')"
        );
    }

    #[test]
    fn test_half_escaped_forms() {
        let escaper = escaper();
        assert_eq!(
            escaper.escape_date_quotes(r"$DATE(dd\'T'HH'Z\')"),
            r"$DATE(dd\'T\'HH\'Z\')"
        );
    }

    #[test]
    fn test_text_outside_macros_is_untouched() {
        let input = "'T' before #UUID('T') #DATE(HH'T') after 'Z'";
        assert_eq!(
            escaper().escape_date_quotes(input),
            r"'T' before #UUID('T') #DATE(HH\'T\') after 'Z'"
        );
    }

    #[test]
    fn test_several_macros_shift_offsets() {
        let input = "#DATE('T')|#DATE('Z')|#DATE(yy)";
        assert_eq!(
            escaper().escape_date_quotes(input),
            r"#DATE(\'T\')|#DATE(\'Z\')|#DATE(yy)"
        );
    }

    #[test]
    fn test_is_idempotent() {
        let escaper = escaper();
        for input in [
            "#DATE(yyyy-MM-dd'T'HH:mm:ss'Z')",
            r"#DATE(dd\'T'HH)",
            "#DATE(a'T'b) and #DATE(c'Z'd)",
            "no macros 'T'",
        ] {
            let once = escaper.escape_date_quotes(input);
            assert_eq!(escaper.escape_date_quotes(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_find_date_macros() {
        let macros = escaper().find_date_macros("a #DATE(x, f(y)) b $DATE(z");
        assert_eq!(macros.len(), 1);
        assert_eq!(macros[0].start(), 2);
        assert_eq!(macros[0].end(), 16);
        assert_eq!(macros[0].text(), "#DATE(x, f(y))");
    }

    #[test]
    fn test_quoted_parens_do_not_count() {
        let escaper = escaper();
        let macros = escaper.find_date_macros("#DATE(HH'(''T' tail) after");
        assert_eq!(macros.len(), 1);
        assert_eq!(macros[0].text(), "#DATE(HH'(''T' tail)");

        let macros = escaper.find_date_macros("#DATE(a')'b) c");
        assert_eq!(macros[0].text(), "#DATE(a')'b)");

        assert_eq!(
            escaper.escape_date_quotes("#DATE(HH'(''T' tail) 'T'"),
            r"#DATE(HH'('\'T\' tail) 'T'"
        );
    }

    #[test]
    fn test_unpaired_quote_is_plain_text() {
        let macros = escaper().find_date_macros("#DATE(it's) done");
        assert_eq!(macros[0].text(), "#DATE(it's)");
    }

    #[test]
    fn test_escaped_paren_does_not_close() {
        let macros = escaper().find_date_macros(r"#DATE(a\)b)");
        assert_eq!(macros[0].text(), r"#DATE(a\)b)");
    }
}
