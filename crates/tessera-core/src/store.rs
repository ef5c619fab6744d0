//! In-memory dataset graph.
//!
//! [`MemoryStore`] implements all three lookup services over plain vectors.
//! It is built by name through [`MemoryStoreBuilder`], which assigns ids and
//! resolves cross-list references in a single validation pass.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use log::debug;
use uuid::Uuid;

use crate::{
    entity::{
        Attribute, AttributeKind, DataSet, DataSetList, EntityKind, ListValue, Parameter,
        ParameterValue,
    },
    error::CoreError,
    service::{AttributeService, DataSetListService, DataSetService},
};

/// An in-memory implementation of the lookup services.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: Vec<DataSetList>,
    datasets: Vec<DataSet>,
    attributes: Vec<Attribute>,
    parameters: HashMap<(Uuid, Uuid), Parameter>,
    parameter_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    pub fn lists(&self) -> &[DataSetList] {
        &self.lists
    }

    /// Number of [`AttributeService::parameter`] calls served so far.
    pub fn parameter_lookups(&self) -> usize {
        self.parameter_lookups.load(Ordering::Relaxed)
    }
}

impl DataSetListService for MemoryStore {
    fn get_list(&self, id: Uuid) -> Option<DataSetList> {
        self.lists.iter().find(|list| list.id() == id).cloned()
    }

    fn find_list(&self, name: &str) -> Option<DataSetList> {
        self.lists.iter().find(|list| list.name() == name).cloned()
    }
}

impl DataSetService for MemoryStore {
    fn get_dataset(&self, id: Uuid) -> Option<DataSet> {
        self.datasets.iter().find(|ds| ds.id() == id).cloned()
    }

    fn find_dataset(&self, list_id: Uuid, name: &str) -> Option<DataSet> {
        self.datasets
            .iter()
            .find(|ds| ds.list_id() == list_id && ds.name() == name)
            .cloned()
    }

    fn datasets_of(&self, list_id: Uuid) -> Vec<DataSet> {
        self.datasets
            .iter()
            .filter(|ds| ds.list_id() == list_id)
            .cloned()
            .collect()
    }
}

impl AttributeService for MemoryStore {
    fn get_attribute(&self, id: Uuid) -> Option<Attribute> {
        self.attributes.iter().find(|attr| attr.id() == id).cloned()
    }

    fn find_attribute(&self, list_id: Uuid, name: &str) -> Option<Attribute> {
        self.attributes
            .iter()
            .find(|attr| attr.list_id() == list_id && attr.name() == name)
            .cloned()
    }

    fn parameter(&self, dataset_id: Uuid, attribute_id: Uuid) -> Option<Parameter> {
        self.parameter_lookups.fetch_add(1, Ordering::Relaxed);
        self.parameters.get(&(dataset_id, attribute_id)).cloned()
    }
}

#[derive(Debug, Clone)]
enum AttributeSpec {
    Text,
    List(Vec<String>),
    Reference(String),
}

#[derive(Debug, Clone)]
enum ValueSpec {
    Text(String),
    ListValue(String),
    Reference(String),
}

impl ValueSpec {
    fn kind_name(&self) -> &'static str {
        match self {
            ValueSpec::Text(_) => "text",
            ValueSpec::ListValue(_) => "list",
            ValueSpec::Reference(_) => "data set reference",
        }
    }
}

/// Declares the values of one dataset.
#[derive(Debug, Clone)]
pub struct DataSetBuilder {
    name: String,
    values: Vec<(String, ValueSpec)>,
}

impl DataSetBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Stores a text value (may contain macros).
    pub fn text(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .push((attribute.into(), ValueSpec::Text(value.into())));
        self
    }

    /// Selects an option of a list attribute.
    pub fn list_value(mut self, attribute: impl Into<String>, option: impl Into<String>) -> Self {
        self.values
            .push((attribute.into(), ValueSpec::ListValue(option.into())));
        self
    }

    /// Points a reference attribute at a dataset of the attribute's target list.
    pub fn reference(mut self, attribute: impl Into<String>, dataset: impl Into<String>) -> Self {
        self.values
            .push((attribute.into(), ValueSpec::Reference(dataset.into())));
        self
    }
}

/// Declares one data set list with its attributes and datasets.
#[derive(Debug, Clone)]
pub struct ListBuilder {
    name: String,
    attributes: Vec<(String, AttributeSpec)>,
    datasets: Vec<DataSetBuilder>,
}

impl ListBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            datasets: Vec::new(),
        }
    }

    /// Adds a text attribute.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push((name.into(), AttributeSpec::Text));
        self
    }

    /// Adds a list attribute with the given options.
    pub fn list_attribute<I, S>(mut self, name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        self.attributes
            .push((name.into(), AttributeSpec::List(options)));
        self
    }

    /// Adds an attribute referencing datasets of `target_list`.
    pub fn reference_attribute(
        mut self,
        name: impl Into<String>,
        target_list: impl Into<String>,
    ) -> Self {
        self.attributes
            .push((name.into(), AttributeSpec::Reference(target_list.into())));
        self
    }

    /// Adds a dataset configured by `f`.
    pub fn dataset(
        mut self,
        name: impl Into<String>,
        f: impl FnOnce(DataSetBuilder) -> DataSetBuilder,
    ) -> Self {
        self.datasets.push(f(DataSetBuilder::new(name)));
        self
    }

    /// Adds an already configured dataset.
    pub fn add_dataset(mut self, dataset: DataSetBuilder) -> Self {
        self.datasets.push(dataset);
        self
    }
}

/// Builder for a validated [`MemoryStore`].
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    lists: Vec<ListBuilder>,
}

impl MemoryStoreBuilder {
    /// Adds a list configured by `f`.
    pub fn list(mut self, name: impl Into<String>, f: impl FnOnce(ListBuilder) -> ListBuilder) -> Self {
        self.lists.push(f(ListBuilder::new(name)));
        self
    }

    /// Adds an already configured list.
    pub fn add_list(mut self, list: ListBuilder) -> Self {
        self.lists.push(list);
        self
    }

    /// Assigns ids, resolves names and validates every value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] for duplicate names, references to unknown lists,
    /// attributes or datasets, unknown list options, and values whose kind
    /// does not match their attribute.
    pub fn build(self) -> Result<MemoryStore, CoreError> {
        let mut store = MemoryStore::default();

        // Pass 1: lists
        let mut list_ids = HashMap::new();
        for list in &self.lists {
            let id = Uuid::new_v4();
            if list_ids.insert(list.name.clone(), id).is_some() {
                return Err(CoreError::DuplicateName {
                    kind: EntityKind::DataSetList,
                    name: list.name.clone(),
                });
            }
            store.lists.push(DataSetList::new(id, &list.name));
        }

        // Pass 2: attributes and datasets
        for list in &self.lists {
            let list_id = list_ids[&list.name];

            let mut seen = HashSet::new();
            for (name, spec) in &list.attributes {
                if !seen.insert(name.as_str()) {
                    return Err(CoreError::DuplicateName {
                        kind: EntityKind::Attribute,
                        name: name.clone(),
                    });
                }
                let kind = match spec {
                    AttributeSpec::Text => AttributeKind::Text,
                    AttributeSpec::List(options) => AttributeKind::List {
                        values: options
                            .iter()
                            .map(|text| ListValue::new(Uuid::new_v4(), text))
                            .collect(),
                    },
                    AttributeSpec::Reference(target) => {
                        let target_id =
                            *list_ids.get(target).ok_or_else(|| CoreError::MissingEntity {
                                kind: EntityKind::DataSetList,
                                name: target.clone(),
                            })?;
                        AttributeKind::DataSetReference { list_id: target_id }
                    }
                };
                store
                    .attributes
                    .push(Attribute::new(Uuid::new_v4(), name, list_id, kind));
            }

            let mut seen = HashSet::new();
            for dataset in &list.datasets {
                if !seen.insert(dataset.name.as_str()) {
                    return Err(CoreError::DuplicateName {
                        kind: EntityKind::DataSet,
                        name: dataset.name.clone(),
                    });
                }
                store
                    .datasets
                    .push(DataSet::new(Uuid::new_v4(), &dataset.name, list_id));
            }
        }

        // Pass 3: parameters
        for list in &self.lists {
            let list_id = list_ids[&list.name];
            for dataset in &list.datasets {
                let dataset_id = store
                    .find_dataset(list_id, &dataset.name)
                    .map(|ds| ds.id())
                    .ok_or_else(|| CoreError::MissingEntity {
                        kind: EntityKind::DataSet,
                        name: dataset.name.clone(),
                    })?;

                for (attribute_name, spec) in &dataset.values {
                    let attribute = store.find_attribute(list_id, attribute_name).ok_or_else(
                        || CoreError::MissingEntity {
                            kind: EntityKind::Attribute,
                            name: attribute_name.clone(),
                        },
                    )?;
                    let value = store.resolve_value(&attribute, spec)?;
                    let parameter =
                        Parameter::new(Uuid::new_v4(), dataset_id, attribute.id(), value);
                    store
                        .parameters
                        .insert((dataset_id, attribute.id()), parameter);
                }
            }
        }

        debug!(
            lists = store.lists.len(),
            datasets = store.datasets.len(),
            parameters = store.parameters.len();
            "Memory store built"
        );

        Ok(store)
    }
}

impl MemoryStore {
    fn resolve_value(
        &self,
        attribute: &Attribute,
        spec: &ValueSpec,
    ) -> Result<ParameterValue, CoreError> {
        match (attribute.kind(), spec) {
            (AttributeKind::Text, ValueSpec::Text(text)) => Ok(ParameterValue::Text(text.clone())),
            (AttributeKind::List { values }, ValueSpec::ListValue(option)) => values
                .iter()
                .find(|value| value.text() == option)
                .map(|value| ParameterValue::ListValue(value.id()))
                .ok_or_else(|| CoreError::UnknownListValue {
                    attribute: attribute.name().to_string(),
                    value: option.clone(),
                }),
            (AttributeKind::DataSetReference { list_id }, ValueSpec::Reference(dataset)) => self
                .find_dataset(*list_id, dataset)
                .map(|ds| ParameterValue::DataSetReference(ds.id()))
                .ok_or_else(|| CoreError::MissingEntity {
                    kind: EntityKind::DataSet,
                    name: dataset.clone(),
                }),
            (_, spec) => Err(CoreError::ValueKindMismatch {
                attribute: attribute.name().to_string(),
                value_kind: spec.kind_name(),
            }),
        }
    }
}
