//! Reference alias types.
//!
//! A reference macro names its target through one of three aliases: `DSL`
//! (a data set list), `DS` (a data set) or `ATTR` (an attribute). The set is
//! closed; each variant carries a stable numeric id and knows which lookup
//! service backs it, so callers never branch on the alias themselves.

use std::{fmt, str::FromStr};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    entity::{EntityKind, Identified},
    error::CoreError,
    service::Services,
};

/// The entity kind a reference alias targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReferenceAliasType {
    /// `DSL`: a data set list.
    Dsl,
    /// `DS`: a data set of the current list.
    Ds,
    /// `ATTR`: an attribute of the current list.
    Attr,
}

impl ReferenceAliasType {
    /// Every alias, in id order.
    pub const ALL: [ReferenceAliasType; 3] = [
        ReferenceAliasType::Dsl,
        ReferenceAliasType::Ds,
        ReferenceAliasType::Attr,
    ];

    /// Stable short numeric id.
    pub fn id(&self) -> u8 {
        match self {
            ReferenceAliasType::Dsl => 1,
            ReferenceAliasType::Ds => 2,
            ReferenceAliasType::Attr => 3,
        }
    }

    /// The alias as written in macro text.
    pub fn name(&self) -> &'static str {
        match self {
            ReferenceAliasType::Dsl => "DSL",
            ReferenceAliasType::Ds => "DS",
            ReferenceAliasType::Attr => "ATTR",
        }
    }

    /// The entity kind this alias resolves to.
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            ReferenceAliasType::Dsl => EntityKind::DataSetList,
            ReferenceAliasType::Ds => EntityKind::DataSet,
            ReferenceAliasType::Attr => EntityKind::Attribute,
        }
    }

    /// Resolves an alias from its numeric id.
    pub fn from_id(id: u8) -> Result<Self, CoreError> {
        let mut matches = Self::ALL.iter().filter(|alias| alias.id() == id);
        match (matches.next(), matches.next()) {
            (Some(alias), None) => Ok(*alias),
            _ => Err(CoreError::UnknownAlias(id.to_string())),
        }
    }

    /// Resolves an alias from its name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        let mut matches = Self::ALL
            .iter()
            .filter(|alias| alias.name().eq_ignore_ascii_case(name));
        match (matches.next(), matches.next()) {
            (Some(alias), None) => Ok(*alias),
            _ => Err(CoreError::UnknownAlias(name.to_string())),
        }
    }

    /// Fetches the entity with the given id from the service backing this alias.
    pub fn fetch(&self, services: &Services<'_>, id: Uuid) -> Option<Identified> {
        match self {
            ReferenceAliasType::Dsl => services.lists().get_list(id).map(Identified::List),
            ReferenceAliasType::Ds => services.datasets().get_dataset(id).map(Identified::DataSet),
            ReferenceAliasType::Attr => services
                .attributes()
                .get_attribute(id)
                .map(Identified::Attribute),
        }
    }

    /// Finds an entity by name from the service backing this alias.
    ///
    /// `list_id` scopes `DS` and `ATTR` lookups; `DSL` names are global.
    pub fn find(
        &self,
        services: &Services<'_>,
        list_id: Option<Uuid>,
        name: &str,
    ) -> Option<Identified> {
        match self {
            ReferenceAliasType::Dsl => services.lists().find_list(name).map(Identified::List),
            ReferenceAliasType::Ds => services
                .datasets()
                .find_dataset(list_id?, name)
                .map(Identified::DataSet),
            ReferenceAliasType::Attr => services
                .attributes()
                .find_attribute(list_id?, name)
                .map(Identified::Attribute),
        }
    }

    /// Checks that a generic entity is of the kind this alias targets.
    pub fn narrow(&self, entity: Identified) -> Result<Identified, CoreError> {
        if entity.kind() == self.entity_kind() {
            Ok(entity)
        } else {
            Err(CoreError::WrongEntityKind {
                expected: self.entity_kind(),
                found: entity.kind(),
                name: entity.name().to_string(),
            })
        }
    }
}

impl fmt::Display for ReferenceAliasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReferenceAliasType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{entity::DataSet, store::MemoryStore};

    #[test]
    fn test_ids_and_names_are_unique() {
        for alias in ReferenceAliasType::ALL {
            assert_eq!(ReferenceAliasType::from_id(alias.id()), Ok(alias));
            assert_eq!(ReferenceAliasType::from_name(alias.name()), Ok(alias));
        }
    }

    #[test]
    fn test_from_name_ignores_case() {
        assert_eq!(
            "dsl".parse::<ReferenceAliasType>(),
            Ok(ReferenceAliasType::Dsl)
        );
        assert_eq!(
            ReferenceAliasType::from_name("Attr"),
            Ok(ReferenceAliasType::Attr)
        );
    }

    #[test]
    fn test_unknown_alias() {
        assert_eq!(
            ReferenceAliasType::from_name("ROW"),
            Err(CoreError::UnknownAlias("ROW".to_string()))
        );
        assert!(ReferenceAliasType::from_id(0).is_err());
        assert!(ReferenceAliasType::from_id(4).is_err());
    }

    #[test]
    fn test_narrow_rejects_other_kinds() {
        let dataset = Identified::DataSet(DataSet::new(Uuid::new_v4(), "ds1", Uuid::new_v4()));

        assert!(ReferenceAliasType::Ds.narrow(dataset.clone()).is_ok());
        assert_eq!(
            ReferenceAliasType::Dsl.narrow(dataset),
            Err(CoreError::WrongEntityKind {
                expected: EntityKind::DataSetList,
                found: EntityKind::DataSet,
                name: "ds1".to_string(),
            })
        );
    }

    #[test]
    fn test_alias_selects_backing_service() {
        let store = MemoryStore::builder()
            .list("Customers", |list| {
                list.attribute("age").dataset("alice", |ds| ds.text("age", "42"))
            })
            .build()
            .expect("valid store");
        let services = Services::from_backend(&store);

        let list = ReferenceAliasType::Dsl
            .find(&services, None, "Customers")
            .expect("list exists");
        assert_eq!(list.kind(), EntityKind::DataSetList);

        let dataset = ReferenceAliasType::Ds
            .find(&services, Some(list.id()), "alice")
            .expect("dataset exists");
        assert_eq!(dataset.kind(), EntityKind::DataSet);

        let attribute = ReferenceAliasType::Attr
            .find(&services, Some(list.id()), "age")
            .expect("attribute exists");
        assert_eq!(attribute.kind(), EntityKind::Attribute);

        let fetched = ReferenceAliasType::Ds
            .fetch(&services, dataset.id())
            .expect("fetch by id");
        assert_eq!(fetched, dataset);

        // Scoped aliases need a list
        assert!(ReferenceAliasType::Ds.find(&services, None, "alice").is_none());
    }
}
