//! The path abstraction the tiler bends geometry onto.

use std::collections::HashMap;

use euclid::Rotation3D;
use ordered_float::OrderedFloat;

use crate::{Bent, BentPoint, BentVector, FreeCoordinate, PartLocal, PartVector};

/// Position and orientation of the path at one arc-length distance.
///
/// The orientation maps part-local axes onto the path's local frame: +X becomes
/// the path tangent, and the vertex's Y/Z offsets span the perpendicular plane.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct PathSample {
    /// Point on the path.
    pub position: BentPoint,
    /// Local frame at that point, as a rotation from part-local space.
    pub orientation: Rotation3D<FreeCoordinate, PartLocal, Bent>,
}

impl PathSample {
    /// Bends a part-local offset from this sample's point into output space.
    #[inline]
    pub fn bend_point(&self, offset: PartVector) -> BentPoint {
        self.position + self.orientation.transform_vector3d(offset)
    }

    /// Bends a part-local direction into output space.
    #[inline]
    pub fn bend_vector(&self, vector: PartVector) -> BentVector {
        self.orientation.transform_vector3d(vector)
    }
}

/// A path that can be sampled by arc-length distance. Implemented by the host's
/// spline (or whatever else positions geometry).
///
/// Within one tiling pass, `sample()` must return the same value for the same
/// distance; the engine caches samples assuming this purity.
pub trait PathSampler {
    /// Total arc length of the path. Sampling is defined over `[0, length]`.
    fn length(&self) -> FreeCoordinate;

    /// Whether the path is a closed loop. Loop paths wrap out-of-range distances
    /// modulo `length()` in repeat mode; the multi-part tiler always clamps.
    fn is_loop(&self) -> bool;

    /// Returns the path's position and frame at `distance` along it.
    fn sample(&self, distance: FreeCoordinate) -> PathSample;
}

/// Pass-scoped memo of path samples keyed by distance.
///
/// Many vertices of an extruded part share an X coordinate and therefore a
/// sample distance; this keeps the sampler from being consulted more than once
/// per distinct distance in a pass.
#[derive(Debug, Default)]
pub struct SampleCache {
    samples: HashMap<OrderedFloat<FreeCoordinate>, PathSample>,
}

impl SampleCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all cached samples. Call at the start of a pass; a new pass may
    /// see a path with the same length but different geometry.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of distinct distances sampled so far.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples have been taken yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the sample at `distance`, consulting `path` only on a cache miss.
    pub fn get_or_sample<P: PathSampler + ?Sized>(
        &mut self,
        path: &P,
        distance: FreeCoordinate,
    ) -> PathSample {
        *self
            .samples
            .entry(OrderedFloat(distance))
            .or_insert_with(|| path.sample(distance))
    }
}

/// Maps a nominal distance into the path's sampling domain: loop paths wrap
/// modulo the length, open paths pin to the nearest endpoint.
pub(crate) fn clamp_or_wrap(
    distance: FreeCoordinate,
    length: FreeCoordinate,
    is_loop: bool,
) -> FreeCoordinate {
    if is_loop && length > 0.0 {
        distance.rem_euclid(length)
    } else {
        distance.clamp(0.0, length)
    }
}
