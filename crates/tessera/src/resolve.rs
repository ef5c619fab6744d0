//! Reference resolution over the data set graph.
//!
//! A reference path names an alias and a chain of names:
//!
//! - `DSL.<list>.<dataset>.<attribute>` or `DSL.<list>.<attribute>`
//! - `DS.<dataset>.<attribute>` within the current list
//! - `ATTR.<attribute>` within the current data set
//!
//! Every attribute except the last must be a data set reference; the chain
//! hops to the referenced data set, as in `ATTR.address.city`.

use std::fmt;

use log::debug;
use uuid::Uuid;

use tessera_core::{
    alias::ReferenceAliasType,
    entity::{Attribute, AttributeKind, DataSet, DataSetList, Parameter, ParameterValue},
    service::Services,
};

use crate::eval::{ContextError, MacroError, Subject};

/// A parsed reference such as `DSL.Customers.alice.age`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePath {
    alias: ReferenceAliasType,
    segments: Vec<String>,
}

impl ReferencePath {
    /// Parse `ALIAS.name[.name...]`. Surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self, MacroError> {
        let text = text.trim();
        let (alias, rest) = text.split_once('.').ok_or_else(|| MacroError::InvalidReference {
            path: text.to_string(),
            reason: "expected `ALIAS.name`".to_string(),
        })?;
        let alias = ReferenceAliasType::from_name(alias).map_err(|err| {
            MacroError::InvalidReference {
                path: text.to_string(),
                reason: err.to_string(),
            }
        })?;
        Self::with_alias(alias, rest)
    }

    /// Parse the names following an alias that is already known.
    pub fn with_alias(alias: ReferenceAliasType, names: &str) -> Result<Self, MacroError> {
        let segments: Vec<String> = names
            .trim()
            .split('.')
            .map(|segment| segment.trim().to_string())
            .collect();

        let path = Self { alias, segments };
        if path.segments.iter().any(String::is_empty) {
            return Err(path.invalid("empty name"));
        }

        let min_segments = match alias {
            ReferenceAliasType::Dsl | ReferenceAliasType::Ds => 2,
            ReferenceAliasType::Attr => 1,
        };
        if path.segments.len() < min_segments {
            return Err(path.invalid(format!(
                "`{alias}` references need at least {min_segments} names"
            )));
        }
        Ok(path)
    }

    pub fn alias(&self) -> ReferenceAliasType {
        self.alias
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn invalid(&self, reason: impl Into<String>) -> MacroError {
        MacroError::InvalidReference {
            path: self.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ReferencePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.segments.join("."))
    }
}

/// The parameter a reference path points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParameter {
    list: DataSetList,
    dataset: DataSet,
    attribute: Attribute,
    parameter: Parameter,
    path: Vec<Uuid>,
}

impl ResolvedParameter {
    pub fn list(&self) -> &DataSetList {
        &self.list
    }

    pub fn dataset(&self) -> &DataSet {
        &self.dataset
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn parameter(&self) -> &Parameter {
        &self.parameter
    }

    /// Lists and reference attributes traversed on the way
    pub fn path(&self) -> &[Uuid] {
        &self.path
    }

    pub fn subject(&self) -> Subject {
        Subject::parameter(self.dataset.id(), self.attribute.id())
    }

    /// `List.dataset.attribute`, used in resolution trails
    pub fn description(&self) -> String {
        format!(
            "{}.{}.{}",
            self.list.name(),
            self.dataset.name(),
            self.attribute.name()
        )
    }
}

/// Walks reference paths through the lookup services.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    services: Services<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(services: Services<'a>) -> Self {
        Self { services }
    }

    /// Find the parameter `path` points at, starting from `current`.
    ///
    /// # Errors
    ///
    /// [`MacroError::ReferenceNotFound`] when a name does not exist,
    /// [`MacroError::InvalidReference`] when an intermediate attribute is
    /// not a data set reference, and [`ContextError::MissingContext`] when
    /// a relative path is resolved without a current data set.
    pub fn resolve(
        &self,
        path: &ReferencePath,
        current: Option<Subject>,
        macro_name: &str,
    ) -> Result<ResolvedParameter, MacroError> {
        let (dataset, attributes, mut hops) = self.start(path, current, macro_name)?;
        debug!(path = path.to_string(), dataset = dataset.name(); "Resolving reference");

        let (last, intermediate) = attributes
            .split_last()
            .ok_or_else(|| path.invalid("missing attribute name"))?;

        let mut dataset = dataset;
        for name in intermediate {
            let attribute = self.attribute(&dataset, name)?;
            if !matches!(attribute.kind(), AttributeKind::DataSetReference { .. }) {
                return Err(path.invalid(format!(
                    "attribute `{name}` is not a data set reference"
                )));
            }
            let target = match self.parameter(&dataset, &attribute)?.value() {
                ParameterValue::DataSetReference(target) => *target,
                _ => {
                    return Err(path.invalid(format!(
                        "attribute `{name}` does not hold a data set reference"
                    )));
                }
            };
            dataset = self.services.datasets().get_dataset(target).ok_or_else(|| {
                MacroError::ReferenceNotFound(format!(
                    "data set referenced by `{}.{name}`",
                    dataset.name()
                ))
            })?;
            hops.push(attribute.id());
        }

        let attribute = self.attribute(&dataset, last)?;
        let parameter = self.parameter(&dataset, &attribute)?;
        let list = self.list_of(&dataset)?;

        Ok(ResolvedParameter {
            list,
            dataset,
            attribute,
            parameter,
            path: hops,
        })
    }

    /// The data set a path starts from, the attribute names left to walk
    /// and the initial path ids.
    fn start<'p>(
        &self,
        path: &'p ReferencePath,
        current: Option<Subject>,
        macro_name: &str,
    ) -> Result<(DataSet, &'p [String], Vec<Uuid>), MacroError> {
        let segments = path.segments();
        let alias = path.alias();

        if alias == ReferenceAliasType::Dsl {
            let list_name = &segments[0];
            let list = alias
                .find(&self.services, None, list_name)
                .and_then(|entity| alias.narrow(entity).ok())
                .and_then(|entity| entity.into_list())
                .ok_or_else(|| {
                    MacroError::ReferenceNotFound(format!("data set list `{list_name}`"))
                })?;
            let rest = &segments[1..];
            let (dataset, attributes) = self.dsl_dataset(&list, rest, current)?;
            return Ok((dataset, attributes, vec![list.id()]));
        }

        let current = self.current_dataset(current, macro_name)?;
        if alias == ReferenceAliasType::Ds {
            let name = &segments[0];
            let dataset = alias
                .find(&self.services, Some(current.list_id()), name)
                .and_then(|entity| alias.narrow(entity).ok())
                .and_then(|entity| entity.into_dataset())
                .ok_or_else(|| MacroError::ReferenceNotFound(format!("data set `{name}`")))?;
            return Ok((dataset, &segments[1..], Vec::new()));
        }

        Ok((current, segments, Vec::new()))
    }

    /// Pick the data set of a `DSL` path.
    ///
    /// With two or more names left, the first one is a data set name if the
    /// list has such a data set. Otherwise the names are all attributes and
    /// the data set is the one named like the current data set, falling back
    /// to the list's first data set.
    fn dsl_dataset<'p>(
        &self,
        list: &DataSetList,
        rest: &'p [String],
        current: Option<Subject>,
    ) -> Result<(DataSet, &'p [String]), MacroError> {
        let datasets = ReferenceAliasType::Ds;
        if rest.len() >= 2 {
            let named = datasets
                .find(&self.services, Some(list.id()), &rest[0])
                .and_then(|entity| entity.into_dataset());
            if let Some(dataset) = named {
                return Ok((dataset, &rest[1..]));
            }
        }

        let current_name = current
            .and_then(|subject| self.services.datasets().get_dataset(subject.dataset_id()))
            .map(|dataset| dataset.name().to_string());
        let same_name = current_name.and_then(|name| {
            datasets
                .find(&self.services, Some(list.id()), &name)
                .and_then(|entity| entity.into_dataset())
        });

        let dataset = match same_name {
            Some(dataset) => dataset,
            None => self
                .services
                .datasets()
                .datasets_of(list.id())
                .into_iter()
                .next()
                .ok_or_else(|| {
                    MacroError::ReferenceNotFound(format!(
                        "any data set in list `{}`",
                        list.name()
                    ))
                })?,
        };
        Ok((dataset, rest))
    }

    fn current_dataset(
        &self,
        current: Option<Subject>,
        macro_name: &str,
    ) -> Result<DataSet, MacroError> {
        let subject = current.ok_or_else(|| ContextError::MissingContext {
            macro_name: macro_name.to_string(),
        })?;
        self.services
            .datasets()
            .get_dataset(subject.dataset_id())
            .ok_or_else(|| {
                MacroError::from(ContextError::MissingContext {
                    macro_name: macro_name.to_string(),
                })
            })
    }

    fn attribute(&self, dataset: &DataSet, name: &str) -> Result<Attribute, MacroError> {
        let alias = ReferenceAliasType::Attr;
        alias
            .find(&self.services, Some(dataset.list_id()), name)
            .and_then(|entity| alias.narrow(entity).ok())
            .and_then(|entity| entity.into_attribute())
            .ok_or_else(|| {
                MacroError::ReferenceNotFound(format!(
                    "attribute `{name}` of data set `{}`",
                    dataset.name()
                ))
            })
    }

    fn parameter(&self, dataset: &DataSet, attribute: &Attribute) -> Result<Parameter, MacroError> {
        self.services
            .attributes()
            .parameter(dataset.id(), attribute.id())
            .ok_or_else(|| {
                MacroError::ReferenceNotFound(format!(
                    "value of `{}` in data set `{}`",
                    attribute.name(),
                    dataset.name()
                ))
            })
    }

    fn list_of(&self, dataset: &DataSet) -> Result<DataSetList, MacroError> {
        ReferenceAliasType::Dsl
            .fetch(&self.services, dataset.list_id())
            .and_then(|entity| entity.into_list())
            .ok_or_else(|| {
                MacroError::ReferenceNotFound(format!("list of data set `{}`", dataset.name()))
            })
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::store::MemoryStore;

    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::builder()
            .list("Addresses", |list| {
                list.attribute("city")
                    .dataset("home", |ds| ds.text("city", "Berlin"))
                    .dataset("office", |ds| ds.text("city", "Paris"))
            })
            .list("Customers", |list| {
                list.attribute("name")
                    .attribute("age")
                    .list_attribute("tier", ["gold", "silver"])
                    .reference_attribute("address", "Addresses")
                    .dataset("alice", |ds| {
                        ds.text("name", "Alice")
                            .text("age", "42")
                            .list_value("tier", "gold")
                            .reference("address", "office")
                    })
                    .dataset("bob", |ds| ds.text("name", "Bob"))
            })
            .build()
            .expect("valid store")
    }

    fn subject(store: &MemoryStore, list: &str, dataset: &str) -> Subject {
        let services = Services::from_backend(store);
        let list = services.lists().find_list(list).expect("list");
        let dataset = services
            .datasets()
            .find_dataset(list.id(), dataset)
            .expect("dataset");
        Subject::dataset(dataset.id())
    }

    fn resolve(
        store: &MemoryStore,
        path: &str,
        current: Option<Subject>,
    ) -> Result<ResolvedParameter, MacroError> {
        let resolver = Resolver::new(Services::from_backend(store));
        resolver.resolve(&ReferencePath::parse(path)?, current, "REF")
    }

    #[test]
    fn test_parse_reference_path() {
        let path = ReferencePath::parse(" dsl.Customers.alice.age ").expect("valid");
        assert_eq!(path.alias(), ReferenceAliasType::Dsl);
        assert_eq!(path.segments(), ["Customers", "alice", "age"]);
        assert_eq!(path.to_string(), "DSL.Customers.alice.age");
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert!(matches!(
            ReferencePath::parse("ROW.x"),
            Err(MacroError::InvalidReference { .. })
        ));
        assert!(ReferencePath::parse("ATTR").is_err());
        assert!(ReferencePath::parse("ATTR.a..b").is_err());
        assert!(ReferencePath::parse("DSL.Customers").is_err());
        assert!(ReferencePath::parse("DS.alice").is_err());
    }

    #[test]
    fn test_dsl_with_dataset() {
        let store = store();
        let resolved = resolve(&store, "DSL.Customers.bob.name", None).expect("resolves");
        assert_eq!(resolved.parameter().value(), &ParameterValue::Text("Bob".into()));
        assert_eq!(resolved.description(), "Customers.bob.name");
        assert_eq!(resolved.path().len(), 1);
    }

    #[test]
    fn test_dsl_without_dataset_uses_first_dataset() {
        let store = store();
        let resolved = resolve(&store, "DSL.Customers.name", None).expect("resolves");
        assert_eq!(resolved.dataset().name(), "alice");
    }

    #[test]
    fn test_dsl_without_dataset_prefers_same_name() {
        let store = store();
        let current = subject(&store, "Addresses", "office");
        let resolved = resolve(&store, "DSL.Addresses.city", Some(current)).expect("resolves");
        assert_eq!(resolved.dataset().name(), "office");

        // `bob` has no namesake in Addresses
        let current = subject(&store, "Customers", "bob");
        let resolved = resolve(&store, "DSL.Addresses.city", Some(current)).expect("resolves");
        assert_eq!(resolved.dataset().name(), "home");
    }

    #[test]
    fn test_ds_and_attr_are_relative() {
        let store = store();
        let current = subject(&store, "Customers", "alice");

        let resolved = resolve(&store, "DS.bob.name", Some(current)).expect("resolves");
        assert_eq!(resolved.dataset().name(), "bob");

        let resolved = resolve(&store, "ATTR.age", Some(current)).expect("resolves");
        assert_eq!(resolved.parameter().value(), &ParameterValue::Text("42".into()));
        assert!(resolved.path().is_empty());
    }

    #[test]
    fn test_reference_attribute_hops() {
        let store = store();
        let current = subject(&store, "Customers", "alice");

        let resolved = resolve(&store, "ATTR.address.city", Some(current)).expect("resolves");
        assert_eq!(resolved.description(), "Addresses.office.city");
        assert_eq!(resolved.path().len(), 1);
    }

    #[test]
    fn test_relative_path_without_context() {
        let store = store();
        let err = resolve(&store, "ATTR.age", None).expect_err("no context");
        assert!(err.is_fatal());
        assert_eq!(
            err,
            MacroError::Context(ContextError::MissingContext {
                macro_name: "REF".to_string()
            })
        );
    }

    #[test]
    fn test_missing_names() {
        let store = store();
        let current = subject(&store, "Customers", "bob");

        assert!(matches!(
            resolve(&store, "DSL.Nowhere.x", None),
            Err(MacroError::ReferenceNotFound(_))
        ));
        assert!(matches!(
            resolve(&store, "ATTR.missing", Some(current)),
            Err(MacroError::ReferenceNotFound(_))
        ));
        // `bob` has no `age` value
        assert!(matches!(
            resolve(&store, "ATTR.age", Some(current)),
            Err(MacroError::ReferenceNotFound(_))
        ));
    }

    #[test]
    fn test_hop_through_plain_attribute_is_invalid() {
        let store = store();
        let current = subject(&store, "Customers", "alice");
        assert!(matches!(
            resolve(&store, "ATTR.name.city", Some(current)),
            Err(MacroError::InvalidReference { .. })
        ));
    }
}
