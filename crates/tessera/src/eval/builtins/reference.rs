use tessera_core::alias::ReferenceAliasType;

use crate::{
    eval::{
        evaluator::Scope,
        registry::{Arity, Macro, MacroError},
    },
    resolve::ReferencePath,
};

/// `REF(ALIAS.path)` and the alias-specific shorthands.
///
/// `REF_DSL(list.ds.attr)`, `REF_DS(ds.attr)` and `REF_THIS(attr)` take a
/// path without the alias prefix.
#[derive(Debug, Clone, Copy)]
pub struct Ref {
    name: &'static str,
    alias: Option<ReferenceAliasType>,
}

impl Ref {
    /// `REF` followed by one shorthand per alias.
    pub fn all() -> [Ref; 4] {
        [
            Ref {
                name: "REF",
                alias: None,
            },
            Ref {
                name: "REF_DSL",
                alias: Some(ReferenceAliasType::Dsl),
            },
            Ref {
                name: "REF_DS",
                alias: Some(ReferenceAliasType::Ds),
            },
            Ref {
                name: "REF_THIS",
                alias: Some(ReferenceAliasType::Attr),
            },
        ]
    }
}

impl Macro for Ref {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn call(&self, args: &[String], scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
        let path = match self.alias {
            Some(alias) => ReferencePath::with_alias(alias, &args[0])?,
            None => ReferencePath::parse(&args[0])?,
        };
        scope.resolve(&path)
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::builtins::test_support::evaluate;

    #[test]
    fn test_malformed_paths_render_inline() {
        assert_eq!(
            evaluate("#REF(ROW.x)"),
            "[ERROR: invalid reference `ROW.x`: unknown reference alias `ROW`]"
        );
        assert!(evaluate("#REF_DSL(Nowhere.x.y)").starts_with("[ERROR: reference not found:"));
    }
}
