//! Entity shapes: the solved full component set of an entity type, plus the
//! storage-block geometry derived from it.
//!
//! All entities created from the same component combination share one
//! reference-counted `Shape`. The shape answers membership queries in O(1)
//! through a component-id bitset, and maps component ids to their byte
//! offsets inside the entity storage block.

use std::alloc::Layout;
use std::sync::Arc;

use fixedbitset::FixedBitSet;

use crate::ecs::component::{Id, Info, Registry};
use crate::ecs::entity::EntityData;
use crate::ecs::list::ListNode;

/// The storage geometry and component set of one entity type.
///
/// The block laid out by a shape is a single contiguous allocation:
///
/// ```text
/// [ EntityData header | component values ... | list nodes ... ]
/// ```
///
/// Components sit at shape-computed offsets after the header; the node array
/// starts at the next `ListNode`-aligned boundary and its length depends on
/// how many lists the concrete entity matched.
pub struct Shape {
    /// Component infos in full-set order (defaults, declared, then implied).
    infos: Vec<Arc<Info>>,

    /// Byte offsets of each component in the block, parallel to `infos`.
    offsets: Vec<usize>,

    /// `(component id, index into infos)` sorted by id, for lookups.
    lookup: Vec<(Id, usize)>,

    /// Component-id membership bitset: the predicate oracle.
    bits: FixedBitSet,

    /// Byte offset of node 0.
    node_base: usize,

    /// Alignment of the whole block.
    align: usize,
}

impl Shape {
    /// Build the shape for a solved full component set.
    ///
    /// `full` must be non-empty, de-duplicated, and contain only registered
    /// ids - which is what the dependency solver produces.
    pub(crate) fn new(registry: &Registry, full: &[Id]) -> Arc<Shape> {
        debug_assert!(!full.is_empty());

        let infos: Vec<Arc<Info>> = full
            .iter()
            .map(|&id| {
                registry
                    .info(id)
                    .expect("full component sets only contain registered components")
            })
            .collect();

        let mut align = align_of::<EntityData>().max(align_of::<ListNode>());
        let mut offset = size_of::<EntityData>();
        let mut offsets = Vec::with_capacity(infos.len());
        for info in &infos {
            let layout = info.layout();
            align = align.max(layout.align());
            offset = align_up(offset, layout.align());
            offsets.push(offset);
            offset += layout.size();
        }
        let node_base = align_up(offset, align_of::<ListNode>());

        let mut lookup: Vec<(Id, usize)> = full.iter().copied().zip(0..).collect();
        lookup.sort_by_key(|(id, _)| *id);

        let max_index = full.iter().map(|id| id.index()).max().unwrap_or(0);
        let mut bits = FixedBitSet::with_capacity(max_index + 1);
        for id in full {
            bits.insert(id.index());
        }

        Arc::new(Shape {
            infos,
            offsets,
            lookup,
            bits,
            node_base,
            align,
        })
    }

    /// Whether the set contains the given component id.
    #[inline]
    pub fn contains(&self, id: Id) -> bool {
        self.bits.contains(id.index())
    }

    /// The byte offset of a component inside the block, if present.
    #[inline]
    pub(crate) fn offset_of(&self, id: Id) -> Option<usize> {
        let slot = self.lookup.binary_search_by_key(&id, |(id, _)| *id).ok()?;
        Some(self.offsets[self.lookup[slot].1])
    }

    /// Component infos with their block offsets, in full-set order.
    #[inline]
    pub(crate) fn components(
        &self,
    ) -> impl DoubleEndedIterator<Item = (&Arc<Info>, usize)> + ExactSizeIterator {
        self.infos.iter().zip(self.offsets.iter().copied())
    }

    /// The number of components in the set.
    #[inline]
    pub fn component_count(&self) -> usize {
        self.infos.len()
    }

    /// The byte offset of node `index` inside the block.
    #[inline]
    pub(crate) fn node_offset(&self, index: usize) -> usize {
        self.node_base + index * size_of::<ListNode>()
    }

    /// The layout of a block with `node_count` nodes.
    pub(crate) fn block_layout(&self, node_count: usize) -> Layout {
        let size = self.node_base + node_count * size_of::<ListNode>();
        Layout::from_size_align(size, self.align).expect("entity block layout overflow")
    }
}

#[inline]
fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use ember_macros::Component;

    use super::*;
    use crate::ecs::component::IntoSpec;

    #[derive(Component, Default)]
    struct Small(u8);

    #[derive(Component, Default)]
    struct Wide(u64);

    fn shape_of<S: IntoSpec>(registry: &Registry) -> Arc<Shape> {
        let ids = S::component_ids(registry);
        Shape::new(registry, &ids)
    }

    #[test]
    fn offsets_respect_alignment() {
        // Given
        let registry = Registry::new();

        // When - A one-byte component precedes an eight-byte-aligned one.
        let shape = shape_of::<(Small, Wide)>(&registry);

        // Then
        let small = registry.get::<Small>().unwrap();
        let wide = registry.get::<Wide>().unwrap();
        let small_off = shape.offset_of(small).unwrap();
        let wide_off = shape.offset_of(wide).unwrap();
        assert!(small_off >= size_of::<EntityData>());
        assert_eq!(wide_off % align_of::<u64>(), 0);
        assert!(wide_off > small_off);
    }

    #[test]
    fn membership_oracle() {
        // Given
        let registry = Registry::new();
        let shape = shape_of::<Small>(&registry);

        // Then
        assert!(shape.contains(registry.get::<Small>().unwrap()));
        assert!(!shape.contains(Id::new(999)));
    }

    #[test]
    fn block_grows_per_node() {
        // Given
        let registry = Registry::new();
        let shape = shape_of::<(Small, Wide)>(&registry);

        // Then - Each extra list membership costs exactly one node.
        let one = shape.block_layout(1).size();
        let two = shape.block_layout(2).size();
        assert_eq!(two - one, size_of::<ListNode>());
        assert_eq!(shape.node_offset(1) - shape.node_offset(0), size_of::<ListNode>());
    }
}
