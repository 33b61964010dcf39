//! Algorithms for tiling small “part” meshes end-to-end along a spline and
//! repackaging the bent result into renderable chunks.
//!
//! The pipeline is: a set of [`PartConfig`]s is snapshotted into immutable
//! [`SourcePart`]s; the [placement](Placements) algorithm decides which part
//! occupies each arc-length slot along the path; every vertex is then bent onto a
//! position/orientation sampled from the path at its arc-length distance; and the
//! bent geometry is accumulated into [`Chunk`]s bounded by a vertex-count and
//! arc-length budget, one open chunk per material.
//!
//! Restrictions and caveats:
//! * Parts are tiled along their local +X axis; a part's “arc length” is its X
//!   extent after its configured transform is applied.
//! * The crate produces vertex/index/UV buffers only. Creating and destroying
//!   renderer-native resources is the caller's job, driven by the [`ChunkDiff`]
//!   returned from each pass.
//! * The path itself is consumed through the [`PathSampler`] trait and is never
//!   inspected beyond its length, loop flag, and per-distance samples.
//!
//! # Getting started
//!
//! [`Tiler`] is the main entry point; give it [`TilerOptions`] and a part list,
//! call [`Tiler::mark_dirty()`] whenever the path or configuration changes, and
//! call [`Tiler::run_pass_if_dirty()`] from whatever update cadence the host has.
//! [`RepeatTiler`] is the single-part variant that repeats one mesh over an
//! interval of the path.

mod bend;
mod chunk;
pub use chunk::{Chunk, ChunkDiff, ChunkId};
mod index;
pub use index::{IndexBuffer, IndexSlice};
mod part;
pub use part::{
    MaterialId, PartConfig, PartGeometry, PartTransform, Placement, SourcePart, UV_CHANNELS,
};
mod path;
pub use path::{PathSample, PathSampler, SampleCache};
mod placement;
pub use placement::Placements;
mod repeat;
pub use repeat::RepeatTiler;
mod tiler;
pub use tiler::Tiler;

#[doc(hidden)]
pub mod testing;


/// Numeric type used for positions, normals, and arc-length distances.
pub type FreeCoordinate = f64;

/// Numeric type used for texture (UV) coordinates.
pub type TextureCoordinate = f32;

/// Unit-of-measure tag for geometry in a part's local space, before bending.
/// The local +X axis is the tiling axis.
#[derive(Debug)]
pub enum PartLocal {}

/// Unit-of-measure tag for geometry after it has been bent onto the path.
#[derive(Debug)]
pub enum Bent {}

/// Unit-of-measure tag for texture coordinates.
#[derive(Debug)]
pub enum Uv {}

/// Position in part-local space.
pub type PartPoint = euclid::Point3D<FreeCoordinate, PartLocal>;
/// Direction or offset in part-local space.
pub type PartVector = euclid::Vector3D<FreeCoordinate, PartLocal>;
/// Position in bent (output) space.
pub type BentPoint = euclid::Point3D<FreeCoordinate, Bent>;
/// Direction in bent (output) space.
pub type BentVector = euclid::Vector3D<FreeCoordinate, Bent>;
/// A texture coordinate pair.
pub type UvPoint = euclid::Point2D<TextureCoordinate, Uv>;

/// Absolute tolerance used when comparing arc lengths and distances.
pub(crate) const LENGTH_EPSILON: FreeCoordinate = 1e-6;

/// Parameters for a tiling pass that aren't the part list or the path itself.
///
/// Creating this and comparing it against a previous instance is appropriate for
/// determining when previously generated chunks are stale; [`Tiler::set_options()`]
/// does exactly that.
#[derive(Clone, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct TilerOptions {
    /// Maximum number of vertices in one emitted chunk.
    ///
    /// Values larger than the 16-bit index domain are clamped at assembly time so
    /// that emitted chunks always remain drawable with 16-bit indices.
    pub max_chunk_vertices: usize,

    /// Arc length after which the open chunk for a material is closed.
    ///
    /// The threshold is checked before a part is appended, so a chunk may exceed
    /// it by the length of the single part that pushed it over.
    pub max_chunk_length: FreeCoordinate,

    /// Seed for the placement algorithm's random draws.
    ///
    /// The pseudo-random stream is re-seeded at the start of every pass, so a
    /// fixed seed and configuration always yield the same placements.
    pub seed: u64,

    /// Uniformly scale all placed parts so their total arc length exactly matches
    /// the path length.
    pub stretch_to_fit: bool,

    /// Passed through on every emitted chunk; the host decides what a collider is.
    pub generate_colliders: bool,
}

impl Default for TilerOptions {
    fn default() -> Self {
        Self {
            max_chunk_vertices: usize::from(u16::MAX),
            max_chunk_length: FreeCoordinate::INFINITY,
            seed: 0,
            stretch_to_fit: false,
            generate_colliders: false,
        }
    }
}

/// Errors that abort a tiling pass.
///
/// A failed pass leaves the previously published chunks untouched.
#[derive(Clone, Copy, Debug, displaydoc::Display, PartialEq)]
#[non_exhaustive]
pub enum TilerError {
    /// part {part_index} has zero extent along its X axis and cannot be tiled
    DegeneratePart {
        /// Index of the offending entry in the configured part list.
        part_index: usize,
    },

    /// interval {from}..{to} does not lie within the path length {length}
    IntervalOutOfRange {
        /// Requested interval start.
        from: FreeCoordinate,
        /// Requested interval end.
        to: FreeCoordinate,
        /// Length of the path the interval was checked against.
        length: FreeCoordinate,
    },
}

impl core::error::Error for TilerError {}
