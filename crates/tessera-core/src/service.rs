//! Read-only lookup capabilities over the dataset graph.
//!
//! These traits are the boundary to whatever persistence backs the graph.
//! Every method is a blocking, side-effect free lookup; latency, retries and
//! timeouts belong to the implementation.

use uuid::Uuid;

use crate::entity::{Attribute, DataSet, DataSetList, Parameter};

/// Lookup of [`DataSetList`] entities.
pub trait DataSetListService {
    fn get_list(&self, id: Uuid) -> Option<DataSetList>;

    /// Finds a list by its (globally unique) name.
    fn find_list(&self, name: &str) -> Option<DataSetList>;
}

/// Lookup of [`DataSet`] entities.
pub trait DataSetService {
    fn get_dataset(&self, id: Uuid) -> Option<DataSet>;

    /// Finds a dataset by name within a list.
    fn find_dataset(&self, list_id: Uuid, name: &str) -> Option<DataSet>;

    /// All datasets of a list, in definition order.
    fn datasets_of(&self, list_id: Uuid) -> Vec<DataSet>;
}

/// Lookup of [`Attribute`] entities and the parameters bound to them.
pub trait AttributeService {
    fn get_attribute(&self, id: Uuid) -> Option<Attribute>;

    /// Finds an attribute by name within a list.
    fn find_attribute(&self, list_id: Uuid, name: &str) -> Option<Attribute>;

    /// The parameter binding `attribute_id` in `dataset_id`, if one is stored.
    fn parameter(&self, dataset_id: Uuid, attribute_id: Uuid) -> Option<Parameter>;
}

/// The three lookup capabilities consumed by reference resolution.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    lists: &'a dyn DataSetListService,
    datasets: &'a dyn DataSetService,
    attributes: &'a dyn AttributeService,
}

impl<'a> Services<'a> {
    pub fn new(
        lists: &'a dyn DataSetListService,
        datasets: &'a dyn DataSetService,
        attributes: &'a dyn AttributeService,
    ) -> Self {
        Self {
            lists,
            datasets,
            attributes,
        }
    }

    /// Builds the bundle from a single backend implementing all three traits.
    pub fn from_backend<B>(backend: &'a B) -> Self
    where
        B: DataSetListService + DataSetService + AttributeService,
    {
        Self::new(backend, backend, backend)
    }

    pub fn lists(&self) -> &'a dyn DataSetListService {
        self.lists
    }

    pub fn datasets(&self) -> &'a dyn DataSetService {
        self.datasets
    }

    pub fn attributes(&self) -> &'a dyn AttributeService {
        self.attributes
    }
}

impl std::fmt::Debug for Services<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
