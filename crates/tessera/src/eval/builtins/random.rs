//! Random value macros.
//!
//! Every draw goes through [`Scope::rng`], so a pass evaluated with the same
//! seed produces the same values.

use rand::{Rng, seq::IndexedRandom};
use uuid::Builder;

use crate::eval::{
    evaluator::Scope,
    registry::{Arity, Macro, MacroError},
};

/// `UUID()` or `UUID_UPPER()`: a random version 4 UUID.
#[derive(Debug, Clone, Copy)]
pub struct UuidMacro {
    upper: bool,
}

impl UuidMacro {
    pub fn lower() -> Self {
        Self { upper: false }
    }

    pub fn upper() -> Self {
        Self { upper: true }
    }
}

impl Macro for UuidMacro {
    fn name(&self) -> &str {
        if self.upper { "UUID_UPPER" } else { "UUID" }
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn call(&self, _args: &[String], scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
        let uuid = Builder::from_random_bytes(scope.rng().random()).into_uuid();
        let text = uuid.hyphenated().to_string();
        Ok(if self.upper { text.to_uppercase() } else { text })
    }
}

/// `RANDOM_CHAR(n)`: `n` lower-case ASCII letters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomChar;

impl Macro for RandomChar {
    fn name(&self) -> &str {
        "RANDOM_CHAR"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn call(&self, args: &[String], scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
        let length = parse_length(&args[0])?;
        let rng = scope.rng();
        Ok((0..length)
            .map(|_| char::from(rng.random_range(b'a'..=b'z')))
            .collect())
    }
}

/// `RANDOM(n)`: `n` decimal digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDigits;

impl Macro for RandomDigits {
    fn name(&self) -> &str {
        "RANDOM"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn call(&self, args: &[String], scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
        let length = parse_length(&args[0])?;
        let rng = scope.rng();
        Ok((0..length)
            .map(|_| char::from(rng.random_range(b'0'..=b'9')))
            .collect())
    }
}

/// `RANDOM_BETWEEN(min, max)`: an integer in the inclusive range.
#[derive(Debug, Clone, Copy)]
pub struct RandomBetween {
    name: &'static str,
}

impl RandomBetween {
    /// Registered under `name`; the legacy spelling is `RANDOMBETWEEN`.
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Macro for RandomBetween {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn call(&self, args: &[String], scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
        let min = parse_integer(&args[0])?;
        let max = parse_integer(&args[1])?;
        if min > max {
            return Err(MacroError::invalid_argument(format!(
                "lower bound {min} is greater than upper bound {max}"
            )));
        }
        Ok(scope.rng().random_range(min..=max).to_string())
    }
}

/// `RANDOM_LIST_VALUE(v1, v2, ...)`: one of the arguments, trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomListValue;

impl Macro for RandomListValue {
    fn name(&self) -> &str {
        "RANDOM_LIST_VALUE"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(1)
    }

    fn call(&self, args: &[String], scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
        args.choose(scope.rng())
            .map(|value| value.trim().to_string())
            .ok_or_else(|| MacroError::invalid_argument("no values to choose from"))
    }
}

fn parse_length(arg: &str) -> Result<usize, MacroError> {
    arg.trim()
        .parse()
        .map_err(|_| MacroError::invalid_argument(format!("`{}` is not a length", arg.trim())))
}

fn parse_integer(arg: &str) -> Result<i64, MacroError> {
    arg.trim()
        .parse()
        .map_err(|_| MacroError::invalid_argument(format!("`{}` is not an integer", arg.trim())))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use uuid::{Uuid, Version};

    use crate::eval::builtins::test_support::{evaluate, evaluate_seeded};

    #[test]
    fn test_uuid_forms() {
        let lower = evaluate("#UUID()");
        let parsed = Uuid::parse_str(&lower).expect("valid uuid");
        assert_eq!(parsed.get_version(), Some(Version::Random));
        assert_eq!(lower, lower.to_lowercase());
        assert_eq!(lower.len(), 36);

        let upper = evaluate("$UUID_UPPER()");
        assert_eq!(upper, upper.to_uppercase());
        assert!(Uuid::parse_str(&upper).is_ok());
    }

    #[test]
    fn test_uuid_rejects_arguments() {
        assert!(evaluate("#UUID(1)").starts_with("[ERROR: `UUID` takes exactly 0 arguments"));
    }

    #[test]
    fn test_two_uuids_in_one_pass_differ() {
        let text = evaluate("#UUID() #UUID()");
        let (a, b) = text.split_once(' ').expect("two values");
        assert_ne!(a, b);
    }

    #[test]
    fn test_random_between_bounds() {
        assert_eq!(evaluate("#RANDOM_BETWEEN(5, 5)"), "5");
        assert_eq!(evaluate("#RANDOMBETWEEN(-3,-3)"), "-3");
        assert!(evaluate("#RANDOM_BETWEEN(9,1)").contains("greater than upper bound"));
        assert!(evaluate("#RANDOM_BETWEEN(a,1)").contains("`a` is not an integer"));
    }

    #[test]
    fn test_random_list_value_picks_an_argument() {
        let value = evaluate("#RANDOM_LIST_VALUE(red, green ,blue)");
        assert!(["red", "green", "blue"].contains(&value.as_str()), "{value}");
    }

    #[test]
    fn test_length_limits() {
        assert_eq!(evaluate("#RANDOM(0)"), "");
        let digits = evaluate("#RANDOM(5000)");
        assert_eq!(digits.len(), 5000);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        let letters = evaluate("#RANDOM_CHAR(5000)");
        assert_eq!(letters.len(), 5000);
        assert!(letters.chars().all(|c| c.is_ascii_lowercase()));
        assert!(evaluate("#RANDOM_CHAR(-1)").contains("is not a length"));
    }

    #[test]
    fn test_same_seed_same_values() {
        let text = "#UUID()-#RANDOM(8)-#RANDOM_CHAR(8)-#RANDOM_BETWEEN(1,1000)";
        assert_eq!(
            evaluate_seeded(text, 42).text(),
            evaluate_seeded(text, 42).text()
        );
        assert_ne!(
            evaluate_seeded(text, 42).text(),
            evaluate_seeded(text, 43).text()
        );
    }

    proptest! {
        #[test]
        fn prop_random_char_is_lowercase(length in 0usize..64, seed in any::<u64>()) {
            let value = evaluate_seeded(&format!("#RANDOM_CHAR({length})"), seed).into_text();
            prop_assert_eq!(value.len(), length);
            prop_assert!(value.chars().all(|c| c.is_ascii_lowercase()));
        }

        #[test]
        fn prop_random_digits(length in 0usize..64, seed in any::<u64>()) {
            let value = evaluate_seeded(&format!("#RANDOM( {length} )"), seed).into_text();
            prop_assert_eq!(value.len(), length);
            prop_assert!(value.chars().all(|c| c.is_ascii_digit()));
        }

        #[test]
        fn prop_random_between_is_inclusive(min in -1000i64..1000, span in 0i64..100, seed in any::<u64>()) {
            let max = min + span;
            let value: i64 = evaluate_seeded(&format!("#RANDOM_BETWEEN({min},{max})"), seed)
                .text()
                .parse()
                .expect("integer output");
            prop_assert!((min..=max).contains(&value));
        }
    }
}
