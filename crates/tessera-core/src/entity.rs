//! Entities of the dataset graph.
//!
//! A [`DataSetList`] owns a set of [`Attribute`] columns and a set of
//! [`DataSet`] rows. Each cell is a [`Parameter`] that binds a dataset to an
//! attribute. Attributes of kind [`AttributeKind::DataSetReference`] point to
//! a dataset in another list, which is how nested references (and cycles)
//! come into existence.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// A named collection of datasets sharing the same attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSetList {
    id: Uuid,
    name: String,
}

impl DataSetList {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A single row of a [`DataSetList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSet {
    id: Uuid,
    name: String,
    list_id: Uuid,
}

impl DataSet {
    pub fn new(id: Uuid, name: impl Into<String>, list_id: Uuid) -> Self {
        Self {
            id,
            name: name.into(),
            list_id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The list this dataset belongs to.
    pub fn list_id(&self) -> Uuid {
        self.list_id
    }
}

/// One selectable option of a [`AttributeKind::List`] attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListValue {
    id: Uuid,
    text: String,
}

impl ListValue {
    pub fn new(id: Uuid, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// What kind of values an attribute holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AttributeKind {
    /// Free text, possibly containing macros.
    Text,
    /// A closed set of options.
    List { values: Vec<ListValue> },
    /// A reference to a dataset of another list.
    DataSetReference { list_id: Uuid },
}

/// A column of a [`DataSetList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    id: Uuid,
    name: String,
    list_id: Uuid,
    kind: AttributeKind,
}

impl Attribute {
    pub fn new(id: Uuid, name: impl Into<String>, list_id: Uuid, kind: AttributeKind) -> Self {
        Self {
            id,
            name: name.into(),
            list_id,
            kind,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The list this attribute belongs to.
    pub fn list_id(&self) -> Uuid {
        self.list_id
    }

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    /// Returns the option with the given id for list attributes.
    pub fn list_value(&self, id: Uuid) -> Option<&ListValue> {
        match &self.kind {
            AttributeKind::List { values } => values.iter().find(|value| value.id() == id),
            _ => None,
        }
    }
}

/// The stored value of a [`Parameter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParameterValue {
    Text(String),
    ListValue(Uuid),
    DataSetReference(Uuid),
}

/// The value of one attribute in one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    id: Uuid,
    dataset_id: Uuid,
    attribute_id: Uuid,
    value: ParameterValue,
}

impl Parameter {
    pub fn new(id: Uuid, dataset_id: Uuid, attribute_id: Uuid, value: ParameterValue) -> Self {
        Self {
            id,
            dataset_id,
            attribute_id,
            value,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dataset_id(&self) -> Uuid {
        self.dataset_id
    }

    pub fn attribute_id(&self) -> Uuid {
        self.attribute_id
    }

    pub fn value(&self) -> &ParameterValue {
        &self.value
    }
}

/// The discriminant of an [`Identified`] entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityKind {
    DataSetList,
    DataSet,
    Attribute,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::DataSetList => write!(f, "data set list"),
            EntityKind::DataSet => write!(f, "data set"),
            EntityKind::Attribute => write!(f, "attribute"),
        }
    }
}

/// Any entity that can be the target of a reference alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Identified {
    List(DataSetList),
    DataSet(DataSet),
    Attribute(Attribute),
}

impl Identified {
    pub fn id(&self) -> Uuid {
        match self {
            Identified::List(list) => list.id(),
            Identified::DataSet(dataset) => dataset.id(),
            Identified::Attribute(attribute) => attribute.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Identified::List(list) => list.name(),
            Identified::DataSet(dataset) => dataset.name(),
            Identified::Attribute(attribute) => attribute.name(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Identified::List(_) => EntityKind::DataSetList,
            Identified::DataSet(_) => EntityKind::DataSet,
            Identified::Attribute(_) => EntityKind::Attribute,
        }
    }

    pub fn into_list(self) -> Option<DataSetList> {
        match self {
            Identified::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_dataset(self) -> Option<DataSet> {
        match self {
            Identified::DataSet(dataset) => Some(dataset),
            _ => None,
        }
    }

    pub fn into_attribute(self) -> Option<Attribute> {
        match self {
            Identified::Attribute(attribute) => Some(attribute),
            _ => None,
        }
    }
}
