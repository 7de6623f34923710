//! In-memory resource collections

use std::io::{Cursor, Read};

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::error::{Error, ResourceNotFoundError, Result};
use crate::types::ResourceId;
use crate::view::{BlockProvider, ResourceProperties, ResourceViewer};

/// A resource held in memory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoredResource {
    /// Properties used when the resource is written
    pub properties: ResourceProperties,
    /// Data of every block
    pub blocks: Vec<Vec<u8>>,
}

impl StoredResource {
    /// Creates a simple resource with a single block
    pub fn simple(properties: ResourceProperties, data: impl Into<Vec<u8>>) -> Self {
        Self {
            properties: ResourceProperties {
                compound: false,
                ..properties
            },
            blocks: vec![data.into()],
        }
    }

    /// Creates a compound resource from its blocks
    pub fn compound(properties: ResourceProperties, blocks: Vec<Vec<u8>>) -> Self {
        Self {
            properties: ResourceProperties {
                compound: true,
                ..properties
            },
            blocks,
        }
    }

    /// Logical size of all blocks
    pub fn size(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }
}

struct StoredProvider<'a> {
    id: ResourceId,
    resource: &'a StoredResource,
}

impl BlockProvider for StoredProvider<'_> {
    fn block_count(&self) -> usize {
        self.resource.blocks.len()
    }

    fn block(&mut self, index: usize) -> Result<Box<dyn Read + '_>> {
        let block = self
            .resource
            .blocks
            .get(index)
            .ok_or(Error::BlockIndexOutOfRange {
                id: self.id,
                index,
                count: self.resource.blocks.len(),
            })?;
        Ok(Box::new(Cursor::new(block.as_slice())))
    }
}

/// Ordered collection of resources held in memory
///
/// Useful to assemble or reshape resource files before writing them with [`crate::write`].
///
/// ```
/// use ss1_res::{ResourceId, ResourceProperties, ResourceStore, StoredResource};
///
/// let mut store = ResourceStore::new();
/// store.insert(
///     ResourceId(0x0100),
///     StoredResource::simple(ResourceProperties::builder().compressed(true).build(), b"text".to_vec()),
/// );
/// let data = ss1_res::write(std::io::Cursor::new(Vec::new()), &mut store)?;
/// # Ok::<(), ss1_res::error::Error>(())
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceStore {
    resources: IndexMap<ResourceId, StoredResource>,
}

impl ResourceStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every resource of `source` into memory
    #[instrument(skip_all, err)]
    pub fn from_viewer<V: ResourceViewer + ?Sized>(source: &mut V) -> Result<Self> {
        let mut store = Self::new();
        for id in source.ids() {
            let properties = source.properties(id)?;
            let mut provider = source.provider(id)?;

            let mut blocks = Vec::with_capacity(provider.block_count());
            for index in 0..provider.block_count() {
                let mut data = Vec::new();
                provider.block(index)?.read_to_end(&mut data)?;
                blocks.push(data);
            }

            store.resources.insert(id, StoredResource { properties, blocks });
        }

        debug!(resources = store.len(), "loaded resources");
        Ok(store)
    }

    /// Number of resources in the store
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the store holds no resources
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Whether a resource with `id` is present
    pub fn contains(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    /// Adds or replaces a resource, returning the previous one.
    ///
    /// A replaced resource keeps its position, new ones are appended.
    pub fn insert(&mut self, id: ResourceId, resource: StoredResource) -> Option<StoredResource> {
        self.resources.insert(id, resource)
    }

    /// Removes a resource, keeping the order of the remaining ones
    pub fn remove(&mut self, id: ResourceId) -> Option<StoredResource> {
        self.resources.shift_remove(&id)
    }

    /// Get a resource by its identifier
    pub fn get(&self, id: ResourceId) -> Option<&StoredResource> {
        self.resources.get(&id)
    }

    /// Get a mutable resource by its identifier
    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut StoredResource> {
        self.resources.get_mut(&id)
    }

    /// Iterates over all resources in order
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &StoredResource)> {
        self.resources.iter().map(|(id, r)| (*id, r))
    }

    /// Iterates mutably over all resources in order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ResourceId, &mut StoredResource)> {
        self.resources.iter_mut().map(|(id, r)| (*id, r))
    }

    fn resource(&self, id: ResourceId) -> Result<&StoredResource> {
        self.resources
            .get(&id)
            .ok_or(Error::ResourceNotFound(ResourceNotFoundError::Id(id)))
    }
}

impl ResourceViewer for ResourceStore {
    fn ids(&self) -> Vec<ResourceId> {
        self.resources.keys().copied().collect()
    }

    fn properties(&self, id: ResourceId) -> Result<ResourceProperties> {
        Ok(self.resource(id)?.properties)
    }

    fn provider(&mut self, id: ResourceId) -> Result<Box<dyn BlockProvider + '_>> {
        let resource = self.resource(id)?;
        Ok(Box::new(StoredProvider { id, resource }))
    }
}
