use crate::eval::{
    evaluator::Scope,
    registry::{Arity, Macro, MacroError},
};

/// `CONCAT(a, b, ...)`: the arguments joined verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct Concat;

impl Macro for Concat {
    fn name(&self) -> &str {
        "CONCAT"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn call(&self, args: &[String], _scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
        Ok(args.concat())
    }
}

/// `SUM(a, b, ...)`: decimal sum of the non-blank arguments.
///
/// Integers are summed exactly; as soon as one argument is fractional (or
/// the sum overflows) the sum is computed in floating point. Whole results
/// render without a fraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl Macro for Sum {
    fn name(&self) -> &str {
        "SUM"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(1)
    }

    fn call(&self, args: &[String], _scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
        let terms: Vec<&str> = args
            .iter()
            .map(|arg| arg.trim())
            .filter(|arg| !arg.is_empty())
            .collect();

        let integers: Option<i64> = terms.iter().try_fold(0i64, |sum, term| {
            term.parse::<i64>().ok().and_then(|n| sum.checked_add(n))
        });
        if let Some(sum) = integers {
            return Ok(sum.to_string());
        }

        let mut sum = 0.0_f64;
        for term in &terms {
            let value: f64 = term
                .parse()
                .map_err(|_| MacroError::invalid_argument(format!("`{term}` is not a number")))?;
            sum += value;
        }
        if !sum.is_finite() {
            return Err(MacroError::invalid_argument("sum is not a finite number"));
        }
        Ok(render_decimal(sum))
    }
}

fn render_decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::builtins::test_support::evaluate;

    #[test]
    fn test_concat() {
        assert_eq!(evaluate("#CONCAT(a, b,c)"), "a bc");
        assert_eq!(evaluate("#CONCAT()"), "");
        assert_eq!(evaluate("#CONCAT(id-,#SUM(1,2))"), "id-3");
    }

    #[test]
    fn test_sum_integers() {
        assert_eq!(evaluate("#SUM(1, 2 ,3)"), "6");
        assert_eq!(evaluate("#SUM(-4,4)"), "0");
        assert_eq!(evaluate("#SUM(1,,2, )"), "3");
    }

    #[test]
    fn test_sum_decimals() {
        assert_eq!(evaluate("#SUM(1.5,2.5)"), "4");
        assert_eq!(evaluate("#SUM(0.25,1)"), "1.25");
    }

    #[test]
    fn test_sum_rejects_text() {
        assert_eq!(
            evaluate("#SUM(1,two)"),
            "[ERROR: invalid argument: `two` is not a number]"
        );
    }

    #[test]
    fn test_render_decimal() {
        assert_eq!(render_decimal(3.0), "3");
        assert_eq!(render_decimal(-0.5), "-0.5");
        assert_eq!(render_decimal(1e20), "100000000000000000000");
    }
}
