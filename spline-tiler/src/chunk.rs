//! Accumulates bent geometry into renderable chunks and reconciles the chunk
//! set across passes.

use std::collections::{HashMap, HashSet};

use bitvec::vec::BitVec;
use itertools::Itertools as _;

use crate::part::UV_CHANNELS;
use crate::{
    BentPoint, BentVector, FreeCoordinate, IndexBuffer, IndexSlice, MaterialId, SourcePart,
    TilerOptions, UvPoint,
};

/// Stable identity of a chunk: which material it draws with, and its position in
/// that material's sequence of chunks along the path.
///
/// Identities are stable across passes, which lets the host reuse renderer
/// resources for chunks that persist (see [`ChunkDiff`]).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[expect(clippy::exhaustive_structs)]
pub struct ChunkId {
    /// Material every triangle in the chunk is drawn with.
    pub material: MaterialId,
    /// Zero-based position among this material's chunks, in path order.
    pub ordinal: usize,
}

impl ChunkId {
    /// Stable name for the host-side resource representing this chunk, prefixed
    /// with the name of whatever owns the tiler.
    pub fn name(&self, owner: &str) -> String {
        format!("{owner}.{}.{}", self.material, self.ordinal)
    }
}

/// One renderable geometry batch: bent vertices and rebased triangle indices for
/// a single material, within the configured vertex and length budgets.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    id: ChunkId,
    positions: Vec<BentPoint>,
    normals: Vec<BentVector>,
    uv: [Vec<UvPoint>; UV_CHANNELS],
    indices: IndexBuffer,
    length: FreeCoordinate,
    parts_used: BitVec,
    collider_enabled: bool,
}

impl Chunk {
    fn new(id: ChunkId, collider_enabled: bool) -> Self {
        Self {
            id,
            positions: Vec::new(),
            normals: Vec::new(),
            uv: [const { Vec::new() }; UV_CHANNELS],
            indices: IndexBuffer::new(),
            length: 0.0,
            parts_used: BitVec::new(),
            collider_enabled,
        }
    }

    /// This chunk's stable identity.
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Material every triangle in this chunk is drawn with.
    pub fn material(&self) -> MaterialId {
        self.id.material
    }

    /// Stable resource name; see [`ChunkId::name()`].
    pub fn name(&self, owner: &str) -> String {
        self.id.name(owner)
    }

    /// Bent vertex positions.
    pub fn positions(&self) -> &[BentPoint] {
        &self.positions
    }

    /// Bent unit normals, parallel to [`Self::positions()`].
    pub fn normals(&self) -> &[BentVector] {
        &self.normals
    }

    /// The given UV channel, or [`None`] if no contributing part used it.
    /// A returned buffer is always exactly as long as the vertex buffer.
    pub fn uv(&self, channel: usize) -> Option<&[UvPoint]> {
        if self.uv[channel].is_empty() {
            None
        } else {
            Some(&self.uv[channel])
        }
    }

    /// Triangle indices, local to this chunk's vertex buffers.
    pub fn indices(&self) -> IndexSlice<'_> {
        self.indices.as_slice(..)
    }

    /// Number of vertices in this chunk.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Arc length of path covered by the parts in this chunk (after stretching).
    pub fn length(&self) -> FreeCoordinate {
        self.length
    }

    /// Whether the host should generate a collider for this chunk; a pass-through
    /// of [`TilerOptions::generate_colliders`].
    pub fn collider_enabled(&self) -> bool {
        self.collider_enabled
    }

    /// True if there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns an iterator over the part-list indices of every part whose
    /// geometry was incorporated into this chunk.
    ///
    /// This may be used to map a part edit to the chunks it affects.
    pub fn parts_used_iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.parts_used.iter_ones()
    }

    #[allow(dead_code, reason = "used conditionally")]
    fn consistency_check(&self) {
        assert_eq!(self.positions.len(), self.normals.len());
        assert!(self.indices.len().is_multiple_of(3));
        for index in self.indices.as_slice(..).iter_u32() {
            assert!((index as usize) < self.positions.len());
        }
        for channel in &self.uv {
            assert!(channel.is_empty() || channel.len() == self.positions.len());
        }
    }
}

/// Builds the chunk list for one pass, slot by slot.
///
/// One chunk per material is open at a time; a part is appended to its
/// material's open chunk unless that would exceed the vertex budget or the
/// chunk's accumulated length already exceeds the length budget, in which case
/// the chunk is closed and a new one opened.
#[derive(Debug)]
pub(crate) struct ChunkAssembler {
    max_vertices: usize,
    max_length: FreeCoordinate,
    collider_enabled: bool,
    /// Index into `chunks` of the open chunk per material.
    open: HashMap<MaterialId, usize>,
    /// Next ordinal to assign per material.
    ordinals: HashMap<MaterialId, usize>,
    chunks: Vec<Chunk>,
}

impl ChunkAssembler {
    pub fn new(options: &TilerOptions) -> Self {
        Self {
            // Emitted chunks must stay drawable with 16-bit indices.
            max_vertices: options.max_chunk_vertices.min(usize::from(u16::MAX)),
            max_length: options.max_chunk_length,
            collider_enabled: options.generate_colliders,
            open: HashMap::new(),
            ordinals: HashMap::new(),
            chunks: Vec::new(),
        }
    }

    /// Appends one placed part's bent geometry. `positions` and `normals` are
    /// the bender's output for this slot; `scaled_length` is the part's arc
    /// length after stretching.
    pub fn append_part(
        &mut self,
        part_index: usize,
        part: &SourcePart,
        scaled_length: FreeCoordinate,
        positions: &[BentPoint],
        normals: &[BentVector],
    ) {
        let material = part.material();
        let chunk_index = match self.open.get(&material) {
            Some(&index) if self.fits(&self.chunks[index], part) => index,
            _ => self.open_chunk(material),
        };
        let chunk = &mut self.chunks[chunk_index];

        let vertex_offset = chunk.positions.len();
        for channel in 0..UV_CHANNELS {
            if let Some(data) = part.uv(channel) {
                // A part that skipped this channel may have left it short; pad
                // the deficit with zeros so per-vertex indexing stays aligned.
                chunk.uv[channel].resize(vertex_offset, UvPoint::origin());
                chunk.uv[channel].extend_from_slice(data);
            }
        }
        chunk.positions.extend_from_slice(positions);
        chunk.normals.extend_from_slice(normals);
        chunk
            .indices
            .extend_rebased(part.indices(), vertex_offset as u32);
        chunk.length += scaled_length;
        bitset_set(&mut chunk.parts_used, part_index);
    }

    /// Closes all open chunks and returns the finished list, with every used UV
    /// channel padded out to its chunk's final vertex count.
    pub fn finish(mut self) -> Vec<Chunk> {
        for chunk in &mut self.chunks {
            let vertex_count = chunk.positions.len();
            for channel in &mut chunk.uv {
                if !channel.is_empty() {
                    channel.resize(vertex_count, UvPoint::origin());
                }
            }
            #[cfg(debug_assertions)]
            chunk.consistency_check();
        }
        self.chunks
    }

    fn fits(&self, chunk: &Chunk, part: &SourcePart) -> bool {
        if chunk.positions.is_empty() {
            return true;
        }
        chunk.positions.len() + part.vertex_count() <= self.max_vertices
            && chunk.length <= self.max_length
    }

    fn open_chunk(&mut self, material: MaterialId) -> usize {
        let ordinal = self.ordinals.entry(material).or_insert(0);
        let id = ChunkId {
            material,
            ordinal: *ordinal,
        };
        *ordinal += 1;

        let index = self.chunks.len();
        self.chunks.push(Chunk::new(id, self.collider_enabled));
        self.open.insert(material, index);
        index
    }
}

/// Sets the given element of the [`BitVec`] to `true`, growing it as needed.
fn bitset_set(v: &mut BitVec, index: usize) {
    if index >= v.len() {
        v.resize(index + 1, false);
    }
    v.set(index, true);
}

/// The chunk-set changes produced by one pass, for the host to apply to its
/// renderer resources: destroy `removed`, create `created`, update `kept`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct ChunkDiff {
    /// Chunks present both before and after the pass. Their geometry may still
    /// have changed; only their identity is stable.
    pub kept: Vec<ChunkId>,
    /// Chunks that did not exist before the pass.
    pub created: Vec<ChunkId>,
    /// Chunks from the previous pass that are no longer produced.
    pub removed: Vec<ChunkId>,
}

/// Matches the previous pass's chunk ids against the new set. All three output
/// lists are sorted.
pub(crate) fn diff_chunks(previous: &[ChunkId], current: &[ChunkId]) -> ChunkDiff {
    let previous_set: HashSet<ChunkId> = previous.iter().copied().collect();
    let current_set: HashSet<ChunkId> = current.iter().copied().collect();

    ChunkDiff {
        kept: current_set.intersection(&previous_set).copied().sorted_unstable().collect(),
        created: current_set.difference(&previous_set).copied().sorted_unstable().collect(),
        removed: previous_set.difference(&current_set).copied().sorted_unstable().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::source_part;
    use crate::{PartConfig, PartGeometry, PartPoint, PartTransform, PartVector, Placement};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn options(max_vertices: usize, max_length: FreeCoordinate) -> TilerOptions {
        TilerOptions {
            max_chunk_vertices: max_vertices,
            max_chunk_length: max_length,
            ..TilerOptions::default()
        }
    }

    /// Appends with placeholder bent buffers; assembly only cares about counts.
    fn append(assembler: &mut ChunkAssembler, part_index: usize, part: &SourcePart) {
        let positions = vec![BentPoint::origin(); part.vertex_count()];
        let normals = vec![BentVector::zero(); part.vertex_count()];
        assembler.append_part(part_index, part, part.arc_length(), &positions, &normals);
    }

    /// A 2×1 grid of quads: six vertices, four triangles.
    fn six_vertex_part() -> SourcePart {
        let geometry = PartGeometry::new(
            vec![
                PartPoint::new(0.0, 0.0, 0.0),
                PartPoint::new(1.0, 0.0, 0.0),
                PartPoint::new(2.0, 0.0, 0.0),
                PartPoint::new(0.0, 1.0, 0.0),
                PartPoint::new(1.0, 1.0, 0.0),
                PartPoint::new(2.0, 1.0, 0.0),
            ],
            vec![PartVector::new(0.0, 0.0, 1.0); 6],
            &[0, 1, 3, 1, 4, 3, 1, 2, 4, 2, 5, 4],
        );
        SourcePart::build(
            &PartConfig {
                geometry: Arc::new(geometry),
                material: MaterialId(0),
                transform: PartTransform::identity(),
                placement: Placement::None,
            },
            0,
        )
        .unwrap()
    }

    #[test]
    fn vertex_budget_splits_chunks() {
        // Three 6-vertex parts with a 10-vertex budget: chunk 1 holds part 1
        // only (6 + 6 = 12 > 10), chunk 2 starts with part 2.
        let part = six_vertex_part();
        let mut assembler = ChunkAssembler::new(&options(10, f64::INFINITY));
        for i in 0..3 {
            append(&mut assembler, i, &part);
        }
        let chunks = assembler.finish();
        assert_eq!(
            chunks
                .iter()
                .map(|c| (c.id().ordinal, c.vertex_count()))
                .collect::<Vec<_>>(),
            vec![(0, 6), (1, 6), (2, 6)]
        );
    }

    #[test]
    fn two_parts_fit_under_a_larger_budget() {
        let part = six_vertex_part();
        let mut assembler = ChunkAssembler::new(&options(12, f64::INFINITY));
        for i in 0..3 {
            append(&mut assembler, i, &part);
        }
        let chunks = assembler.finish();
        assert_eq!(
            chunks.iter().map(Chunk::vertex_count).collect::<Vec<_>>(),
            vec![12, 6]
        );
        assert_eq!(chunks[0].parts_used_iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(chunks[1].parts_used_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn length_budget_closes_after_overshoot() {
        // The length check happens before appending, so a chunk may exceed the
        // budget by exactly the part that pushed it over.
        let part = source_part(4.0, Placement::None);
        let mut assembler = ChunkAssembler::new(&options(usize::MAX, 10.0));
        for i in 0..4 {
            append(&mut assembler, i, &part);
        }
        let chunks = assembler.finish();
        assert_eq!(
            chunks.iter().map(|c| c.length()).collect::<Vec<_>>(),
            vec![12.0, 4.0]
        );
    }

    #[test]
    fn materials_get_separate_chunks() {
        let a = source_part(1.0, Placement::None);
        let b = SourcePart::build(
            &crate::testing::ribbon_config(1.0, MaterialId(7), Placement::None),
            1,
        )
        .unwrap();
        let mut assembler = ChunkAssembler::new(&options(100, f64::INFINITY));
        append(&mut assembler, 0, &a);
        append(&mut assembler, 1, &b);
        append(&mut assembler, 0, &a);
        let chunks = assembler.finish();
        assert_eq!(
            chunks.iter().map(|c| (c.material(), c.vertex_count())).collect::<Vec<_>>(),
            vec![(MaterialId(0), 8), (MaterialId(7), 4)]
        );
    }

    #[test]
    fn uv_channels_are_padded_never_ragged() {
        // Part 0 has UV0; the bare part has none; the final chunk's UV0 buffer
        // must still cover every vertex.
        let with_uv = source_part(1.0, Placement::None);
        let bare = {
            let geometry = PartGeometry::new(
                vec![
                    PartPoint::new(0.0, 0.0, 0.0),
                    PartPoint::new(1.0, 0.0, 0.0),
                    PartPoint::new(1.0, 1.0, 0.0),
                ],
                vec![PartVector::new(0.0, 0.0, 1.0); 3],
                &[0, 1, 2],
            );
            SourcePart::build(
                &PartConfig {
                    geometry: Arc::new(geometry),
                    material: MaterialId(0),
                    transform: PartTransform::identity(),
                    placement: Placement::None,
                },
                1,
            )
            .unwrap()
        };

        let mut assembler = ChunkAssembler::new(&options(100, f64::INFINITY));
        append(&mut assembler, 0, &bare);
        append(&mut assembler, 1, &with_uv);
        append(&mut assembler, 2, &bare);
        let chunks = assembler.finish();

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.vertex_count(), 10);
        let uv0 = chunk.uv(0).expect("UV0 was used by a contributing part");
        assert_eq!(uv0.len(), chunk.vertex_count());
        // The bare part's vertices got zero UVs, before and after; the ribbon's
        // own UVs landed at its rebased vertex positions.
        assert_eq!(uv0[0], UvPoint::origin());
        assert_eq!(uv0[4], UvPoint::new(0.0, 1.0));
        assert_eq!(uv0[9], UvPoint::origin());
        assert_eq!(chunk.uv(1), None);
    }

    #[test]
    fn indices_are_rebased_by_vertex_offset() {
        let part = source_part(1.0, Placement::None);
        let mut assembler = ChunkAssembler::new(&options(100, f64::INFINITY));
        append(&mut assembler, 0, &part);
        append(&mut assembler, 1, &part);
        let chunks = assembler.finish();
        let indices: Vec<u32> = chunks[0].indices().iter_u32().collect();
        assert_eq!(indices[..6], [0, 2, 1, 1, 2, 3]);
        assert_eq!(indices[6..], [4, 6, 5, 5, 6, 7]);
    }

    #[test]
    fn chunk_names_are_stable() {
        let id = ChunkId {
            material: MaterialId(2),
            ordinal: 1,
        };
        assert_eq!(id.name("rail"), "rail.2.1");
    }

    #[test]
    fn diff_reports_kept_created_removed() {
        let m = MaterialId(0);
        let id = |ordinal| ChunkId { material: m, ordinal };
        let previous = [id(0), id(1), id(2)];
        let current = [id(0), id(1)];
        assert_eq!(
            diff_chunks(&previous, &current),
            ChunkDiff {
                kept: vec![id(0), id(1)],
                created: vec![],
                removed: vec![id(2)],
            }
        );
    }
}
