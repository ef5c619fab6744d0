//! Built-in macros.
//!
//! | Macro | Arguments | Output |
//! |-------|-----------|--------|
//! | `DATE` | pattern, offsets... | current time, shifted and formatted |
//! | `UUID`, `UUID_UPPER` | none | random v4 UUID |
//! | `RANDOM_CHAR` | length | lower-case letters |
//! | `RANDOM` | length | digits |
//! | `RANDOM_BETWEEN`, `RANDOMBETWEEN` | min, max | integer in `[min, max]` |
//! | `RANDOM_LIST_VALUE` | values... | one of the values |
//! | `CONCAT` | values... | values joined |
//! | `SUM` | numbers... | decimal sum |
//! | `REF`, `REF_DSL`, `REF_DS`, `REF_THIS` | path | referenced value |

mod date;
mod random;
mod reference;
mod text;

use crate::eval::registry::MacroRegistry;

pub use date::Date;
pub use random::{RandomBetween, RandomChar, RandomDigits, RandomListValue, UuidMacro};
pub use reference::Ref;
pub use text::{Concat, Sum};

/// Add every built-in macro to `registry`.
pub fn register_all(registry: &mut MacroRegistry) {
    registry
        .register(Date)
        .register(UuidMacro::lower())
        .register(UuidMacro::upper())
        .register(RandomChar)
        .register(RandomDigits)
        .register(RandomBetween::new("RANDOM_BETWEEN"))
        .register(RandomBetween::new("RANDOMBETWEEN"))
        .register(RandomListValue)
        .register(Concat)
        .register(Sum);

    for r#ref in Ref::all() {
        registry.register(r#ref);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, FixedOffset};
    use rand::{SeedableRng, rngs::StdRng};
    use tessera_core::{service::Services, store::MemoryStore};

    use crate::eval::{Evaluation, Evaluator, FixedClock, MacroRegistry};

    /// 2024-02-29 13:45:07.123 at UTC+01:00
    pub fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-02-29T13:45:07.123+01:00").expect("valid date")
    }

    /// Evaluate free text with the built-ins, an empty store and a fixed clock.
    pub fn evaluate_seeded(text: &str, seed: u64) -> Evaluation {
        let store = MemoryStore::default();
        let registry = MacroRegistry::with_builtins();
        let clock = FixedClock::new(now());
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock);
        let mut rng = StdRng::seed_from_u64(seed);
        evaluator
            .evaluate(text, None, &mut rng)
            .expect("no fatal error")
    }

    pub fn evaluate(text: &str) -> String {
        evaluate_seeded(text, 7).into_text()
    }
}
