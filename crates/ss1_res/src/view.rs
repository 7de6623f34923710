//! Read-only access to resources for consumers of this library
//!
//! Anything implementing [`ResourceViewer`] can be serialized with [`crate::write::write`].

use std::io::Read;

use bon::Builder;

use crate::error::Result;
use crate::types::{ContentType, ResourceFlags, ResourceId};

/// Properties of a resource besides its data
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Builder)]
pub struct ResourceProperties {
    /// Interpretation of the data
    #[builder(default, into)]
    pub content_type: ContentType,

    /// Whether the data is stored compressed
    #[builder(default)]
    pub compressed: bool,

    /// Whether the resource has 0..N blocks instead of exactly one
    #[builder(default)]
    pub compound: bool,
}

impl ResourceProperties {
    /// Storage flags for these properties
    pub fn flags(&self) -> ResourceFlags {
        ResourceFlags::new(self.compressed, self.compound)
    }
}

/// Provides the blocks of a single resource
pub trait BlockProvider {
    /// Number of blocks available
    fn block_count(&self) -> usize;

    /// Reader for the data of the block at `index`
    fn block(&mut self, index: usize) -> Result<Box<dyn Read + '_>>;
}

/// Provides a set of resources
pub trait ResourceViewer {
    /// Identifiers of all resources, in their stored order
    fn ids(&self) -> Vec<ResourceId>;

    /// Properties of the resource with `id`
    fn properties(&self, id: ResourceId) -> Result<ResourceProperties>;

    /// Access to the blocks of the resource with `id`
    fn provider(&mut self, id: ResourceId) -> Result<Box<dyn BlockProvider + '_>>;
}
