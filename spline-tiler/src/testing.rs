//! Test helpers for spline-tiler tests and benches.
//!
//! This module is public but doc(hidden).

use core::cell::Cell;
use core::f64::consts::TAU;
use std::sync::Arc;

use euclid::{Angle, Rotation3D};

use crate::{
    BentPoint, FreeCoordinate, MaterialId, PartConfig, PartGeometry, PartPoint, PartTransform,
    PartVector, PathSample, PathSampler, Placement, SourcePart, UvPoint,
};

/// A flat two-triangle ribbon spanning `x ∈ [0, length]`, `y ∈ [-0.5, 0.5]`,
/// with +Z normals and a unit UV0 channel.
pub fn ribbon_geometry(length: FreeCoordinate) -> PartGeometry {
    PartGeometry::new(
        vec![
            PartPoint::new(0.0, -0.5, 0.0),
            PartPoint::new(0.0, 0.5, 0.0),
            PartPoint::new(length, -0.5, 0.0),
            PartPoint::new(length, 0.5, 0.0),
        ],
        vec![PartVector::new(0.0, 0.0, 1.0); 4],
        &[0, 2, 1, 1, 2, 3],
    )
    .with_uv(
        0,
        vec![
            UvPoint::new(0.0, 0.0),
            UvPoint::new(0.0, 1.0),
            UvPoint::new(1.0, 0.0),
            UvPoint::new(1.0, 1.0),
        ],
    )
}

/// A [`PartConfig`] wrapping [`ribbon_geometry()`].
pub fn ribbon_config(
    length: FreeCoordinate,
    material: MaterialId,
    placement: Placement,
) -> PartConfig {
    PartConfig {
        geometry: Arc::new(ribbon_geometry(length)),
        material,
        transform: PartTransform::identity(),
        placement,
    }
}

/// A ready-built [`SourcePart`] for placement and bending tests.
pub fn source_part(length: FreeCoordinate, placement: Placement) -> SourcePart {
    SourcePart::build(&ribbon_config(length, MaterialId(0), placement), 0)
        .expect("test ribbon should not be degenerate")
}

/// A straight path along +X with the identity frame everywhere.
///
/// Panics if sampled outside `[0, length]`, so any test using it also checks the
/// sampler-domain property.
#[derive(Clone, Copy, Debug)]
pub struct LinePath {
    /// Arc length of the path.
    pub length: FreeCoordinate,
}

impl PathSampler for LinePath {
    fn length(&self) -> FreeCoordinate {
        self.length
    }

    fn is_loop(&self) -> bool {
        false
    }

    fn sample(&self, distance: FreeCoordinate) -> PathSample {
        assert!(
            (0.0..=self.length).contains(&distance),
            "sample distance {distance} outside [0, {}]",
            self.length
        );
        PathSample {
            position: BentPoint::new(distance, 0.0, 0.0),
            orientation: Rotation3D::identity(),
        }
    }
}

/// A circular arc of the given radius turning left (counterclockwise around +Z),
/// starting at the origin heading +X. A full circle when `is_loop` is set.
#[derive(Clone, Copy, Debug)]
pub struct ArcPath {
    /// Radius of the circle the path follows.
    pub radius: FreeCoordinate,
    /// Fraction of a full turn covered by the path (0.25 = quarter circle).
    pub turns: FreeCoordinate,
    /// Reported loop flag; only meaningful with `turns == 1.0`.
    pub looped: bool,
}

impl PathSampler for ArcPath {
    fn length(&self) -> FreeCoordinate {
        self.radius * TAU * self.turns
    }

    fn is_loop(&self) -> bool {
        self.looped
    }

    fn sample(&self, distance: FreeCoordinate) -> PathSample {
        let angle = distance / self.radius;
        PathSample {
            position: BentPoint::new(
                self.radius * angle.sin(),
                self.radius * (1.0 - angle.cos()),
                0.0,
            ),
            orientation: Rotation3D::around_z(Angle::radians(angle)),
        }
    }
}

/// A [`LinePath`] that counts how many times it is actually sampled, for
/// verifying the per-pass sample cache.
#[derive(Debug)]
pub struct CountingPath {
    inner: LinePath,
    count: Cell<usize>,
}

impl CountingPath {
    /// Creates a counting path of the given length.
    pub fn new(length: FreeCoordinate) -> Self {
        Self {
            inner: LinePath { length },
            count: Cell::new(0),
        }
    }

    /// Number of `sample()` calls made so far.
    pub fn sample_count(&self) -> usize {
        self.count.get()
    }
}

impl PathSampler for CountingPath {
    fn length(&self) -> FreeCoordinate {
        self.inner.length()
    }

    fn is_loop(&self) -> bool {
        false
    }

    fn sample(&self, distance: FreeCoordinate) -> PathSample {
        self.count.set(self.count.get() + 1);
        self.inner.sample(distance)
    }
}
