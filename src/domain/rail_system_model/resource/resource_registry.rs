use std::collections::BTreeMap;

use crate::domain::rail_system_model::resource::resource::{Resource, ResourceKind};
use crate::domain::rail_system_model::utils::id::ResourceId;

/// All tracks and platforms of the network, keyed by id.
///
/// Iteration order is the id order, which every consumer that produces output relies on.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<ResourceId, Resource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self { resources: BTreeMap::new() }
    }

    /// Adds the resource to the registry.
    ///
    /// # Returns
    /// `false` if a resource with the same id was already registered (the registry is left unchanged).
    pub fn add(&mut self, resource: Resource) -> bool {
        if self.resources.contains_key(&resource.id) {
            log::warn!("Resource {} was registered twice. Second registration ignored.", resource.id);
            return false;
        }

        self.resources.insert(resource.id.clone(), resource);
        true
    }

    /// Replaces an existing resource definition. Returns the previous definition.
    pub fn replace(&mut self, resource: Resource) -> Option<Resource> {
        if !self.resources.contains_key(&resource.id) {
            return None;
        }
        self.resources.insert(resource.id.clone(), resource)
    }

    pub fn remove(&mut self, id: &ResourceId) -> Option<Resource> {
        self.resources.remove(id)
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resources.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.resources.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(move |resource| resource.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
