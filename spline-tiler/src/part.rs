//! Part configuration and the pre-transformed snapshots tiling works from.

use core::fmt;
use std::sync::Arc;

use euclid::Rotation3D;

use crate::{
    FreeCoordinate, IndexBuffer, IndexSlice, LENGTH_EPSILON, PartLocal, PartPoint, PartVector,
    TilerError, UvPoint,
};

/// Number of UV channels carried per vertex. Channels are individually optional.
pub const UV_CHANNELS: usize = 8;

/// Opaque handle to a host-side material.
///
/// The tiling engine never interprets this beyond equality; it is used to group
/// chunks so each chunk is a single drawable batch.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[expect(clippy::exhaustive_structs)]
pub struct MaterialId(pub u32);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable vertex/index data for one part mesh, in part-local space.
///
/// Share it between [`PartConfig`]s with [`Arc`]; configs compare geometry by
/// reference, so replacing the `Arc` is how a mesh edit is signalled.
#[derive(Debug, PartialEq)]
pub struct PartGeometry {
    positions: Vec<PartPoint>,
    normals: Vec<PartVector>,
    uv: [Option<Vec<UvPoint>>; UV_CHANNELS],
    indices: IndexBuffer,
}

impl PartGeometry {
    /// Creates geometry from parallel position/normal arrays and a triangle list.
    ///
    /// Panics if `normals` is not the same length as `positions`, if `indices` is
    /// not a multiple of 3 long, or if any index is out of range. These are
    /// programming errors in the host, not configuration errors.
    pub fn new(positions: Vec<PartPoint>, normals: Vec<PartVector>, indices: &[u32]) -> Self {
        assert_eq!(
            positions.len(),
            normals.len(),
            "normal count must match vertex count"
        );
        assert!(
            indices.len().is_multiple_of(3),
            "index count must be a multiple of 3"
        );
        assert!(
            indices.iter().all(|&i| (i as usize) < positions.len()),
            "triangle index out of range"
        );
        Self {
            positions,
            normals,
            uv: [const { None }; UV_CHANNELS],
            indices: indices.iter().copied().collect(),
        }
    }

    /// Adds a UV channel. Panics if `channel >= UV_CHANNELS` or the data length
    /// does not match the vertex count.
    #[must_use]
    pub fn with_uv(mut self, channel: usize, uv: Vec<UvPoint>) -> Self {
        assert_eq!(
            uv.len(),
            self.positions.len(),
            "UV count must match vertex count"
        );
        self.uv[channel] = Some(uv);
        self
    }

    /// Number of vertices in this geometry.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Translate → rotate → scale transform baked into a part's vertices when its
/// [`SourcePart`] snapshot is built.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct PartTransform {
    /// Applied first, in part-local coordinates.
    pub translation: PartVector,
    /// Applied after translation.
    pub rotation: Rotation3D<FreeCoordinate, PartLocal, PartLocal>,
    /// Per-axis scale, applied last. Ignored for normals except renormalization.
    pub scale: PartVector,
}

impl PartTransform {
    /// The transform that leaves geometry unchanged.
    pub fn identity() -> Self {
        Self {
            translation: PartVector::zero(),
            rotation: Rotation3D::identity(),
            scale: PartVector::new(1.0, 1.0, 1.0),
        }
    }

    fn transform_point(&self, point: PartPoint) -> PartPoint {
        let p = self.rotation.transform_point3d(point + self.translation);
        PartPoint::new(p.x * self.scale.x, p.y * self.scale.y, p.z * self.scale.z)
    }

    fn transform_normal(&self, normal: PartVector) -> PartVector {
        let rotated = self.rotation.transform_vector3d(normal);
        rotated.try_normalize().unwrap_or(rotated)
    }
}

impl Default for PartTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// How the placement algorithm treats a part when filling slots along the path.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum Placement {
    /// Default filler: used for every slot no other rule claims.
    None,
    /// Pinned to a fixed slot. A non-negative value is a slot index counted from
    /// the path start; a negative value counts from the path end (`-0.0`…`-0.49`
    /// rounds to the last slot, `-1` to the one before it, and so on). The value
    /// is rounded to the nearest whole index.
    Sequence(FreeCoordinate),
    /// Weighted random: each time its turn comes up, a fresh random draw in
    /// `[0, 1)` is compared against this probability.
    Random(FreeCoordinate),
}

impl Placement {
    /// The pinned slot index counted from the path start, if this is a
    /// forward-anchored sequence placement.
    pub(crate) fn forward_index(self) -> Option<usize> {
        match self {
            Placement::Sequence(value) if value.is_sign_positive() => Some(value.round() as usize),
            _ => None,
        }
    }

    /// The pinned slot index counted from the path end, if this is a
    /// backward-anchored sequence placement.
    pub(crate) fn backward_index(self) -> Option<usize> {
        match self {
            Placement::Sequence(value) if value.is_sign_negative() => Some((-value).round() as usize),
            _ => None,
        }
    }
}

/// One entry in the part list: which mesh to place, with what material,
/// transform, and placement rule.
///
/// Value-comparable; the engine rebuilds a part's [`SourcePart`] snapshot only
/// when its config compares unequal to the one it was built from. Geometry
/// compares by [`Arc`] identity; the reference is the field's value.
#[derive(Clone, Debug)]
#[expect(clippy::exhaustive_structs)]
pub struct PartConfig {
    /// Mesh data to place.
    pub geometry: Arc<PartGeometry>,
    /// Material all of this part's triangles are drawn with.
    pub material: MaterialId,
    /// Baked into the snapshot at build time.
    pub transform: PartTransform,
    /// Slot-filling rule.
    pub placement: Placement,
}

impl PartialEq for PartConfig {
    fn eq(&self, other: &Self) -> bool {
        let Self {
            geometry,
            material,
            transform,
            placement,
        } = self;
        Arc::ptr_eq(geometry, &other.geometry)
            && *material == other.material
            && *transform == other.transform
            && *placement == other.placement
    }
}

/// Immutable, pre-transformed snapshot of one configured part.
///
/// Built from a [`PartConfig`] by applying its transform to every vertex and
/// measuring the result's X extent; everything the per-pass stages need is read
/// from here, never from the config.
#[derive(Clone, Debug, PartialEq)]
pub struct SourcePart {
    positions: Vec<PartPoint>,
    normals: Vec<PartVector>,
    uv: [Option<Vec<UvPoint>>; UV_CHANNELS],
    indices: IndexBuffer,
    material: MaterialId,
    placement: Placement,
    arc_length: FreeCoordinate,
    min_x: FreeCoordinate,
}

impl SourcePart {
    /// Builds the snapshot, or reports a configuration error if the transformed
    /// mesh has no usable X extent.
    pub(crate) fn build(config: &PartConfig, part_index: usize) -> Result<Self, TilerError> {
        let geometry = &*config.geometry;
        let positions: Vec<PartPoint> = geometry
            .positions
            .iter()
            .map(|&p| config.transform.transform_point(p))
            .collect();
        let normals: Vec<PartVector> = geometry
            .normals
            .iter()
            .map(|&n| config.transform.transform_normal(n))
            .collect();

        let (min_x, max_x) = positions.iter().fold(
            (FreeCoordinate::INFINITY, FreeCoordinate::NEG_INFINITY),
            |(min, max), p| (min.min(p.x), max.max(p.x)),
        );
        let arc_length = max_x - min_x;
        if arc_length <= LENGTH_EPSILON {
            return Err(TilerError::DegeneratePart { part_index });
        }

        Ok(Self {
            positions,
            normals,
            uv: geometry.uv.clone(),
            indices: geometry.indices.clone(),
            material: config.material,
            placement: config.placement,
            arc_length,
            min_x,
        })
    }

    /// Transformed vertex positions, in part-local space.
    pub fn positions(&self) -> &[PartPoint] {
        &self.positions
    }

    /// Transformed unit normals, parallel to [`Self::positions()`].
    pub fn normals(&self) -> &[PartVector] {
        &self.normals
    }

    /// The given UV channel's data, if the source mesh provided it.
    pub fn uv(&self, channel: usize) -> Option<&[UvPoint]> {
        self.uv[channel].as_deref()
    }

    /// Triangle indices into this part's vertex arrays.
    pub fn indices(&self) -> IndexSlice<'_> {
        self.indices.as_slice(..)
    }

    /// Material this part's triangles are drawn with.
    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Slot-filling rule copied from the config.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// X extent of the transformed mesh; the length of path one copy occupies.
    pub fn arc_length(&self) -> FreeCoordinate {
        self.arc_length
    }

    /// Smallest transformed X coordinate; subtracted during bending so the part
    /// starts exactly at its slot's start distance.
    pub fn min_x(&self) -> FreeCoordinate {
        self.min_x
    }

    /// Number of vertices in this part.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}
