//! Maps part-local vertices onto the path.

use crate::path::clamp_or_wrap;
use crate::{
    BentPoint, BentVector, FreeCoordinate, PartVector, PathSampler, SampleCache, SourcePart,
};

/// Bends every vertex of `part` onto `path`, writing into the reusable output
/// buffers (cleared first).
///
/// A vertex's distance along the path is its scaled local X, re-anchored so the
/// part's minimum X lands at `running_offset`, and clamped to the path's domain;
/// vertices that would fall off either end are pinned to the endpoint rather
/// than extrapolated. The vertex's Y/Z offsets are carried into the sample's
/// perpendicular plane unscaled.
pub(crate) fn bend_part<P: PathSampler + ?Sized>(
    part: &SourcePart,
    scale: FreeCoordinate,
    running_offset: FreeCoordinate,
    path: &P,
    cache: &mut SampleCache,
    positions_out: &mut Vec<BentPoint>,
    normals_out: &mut Vec<BentVector>,
) {
    let path_length = path.length();
    let anchor = running_offset - part.min_x() * scale;

    positions_out.clear();
    normals_out.clear();
    positions_out.reserve(part.vertex_count());
    normals_out.reserve(part.vertex_count());

    for (&position, &normal) in part.positions().iter().zip(part.normals()) {
        let distance = (position.x * scale + anchor).clamp(0.0, path_length);
        let sample = cache.get_or_sample(path, distance);
        positions_out.push(sample.bend_point(PartVector::new(0.0, position.y, position.z)));
        normals_out.push(sample.bend_vector(normal));
    }
}

/// Interval-restricted variant used by repeat mode: no stretching, and
/// out-of-range distances wrap modulo the path length on loop paths (so
/// geometry continues across a closed spline's seam) or pin to the interval
/// bounds on open ones.
pub(crate) fn bend_interval_part<P: PathSampler + ?Sized>(
    part: &SourcePart,
    running_offset: FreeCoordinate,
    (from, to): (FreeCoordinate, FreeCoordinate),
    path: &P,
    cache: &mut SampleCache,
    positions_out: &mut Vec<BentPoint>,
    normals_out: &mut Vec<BentVector>,
) {
    let length = path.length();
    let is_loop = path.is_loop();
    let anchor = running_offset - part.min_x();

    positions_out.clear();
    normals_out.clear();
    positions_out.reserve(part.vertex_count());
    normals_out.reserve(part.vertex_count());

    for (&position, &normal) in part.positions().iter().zip(part.normals()) {
        let nominal = position.x + anchor;
        let distance = if is_loop {
            clamp_or_wrap(nominal, length, true)
        } else {
            nominal.clamp(from, to)
        };
        let sample = cache.get_or_sample(path, distance);
        positions_out.push(sample.bend_point(PartVector::new(0.0, position.y, position.z)));
        normals_out.push(sample.bend_vector(normal));
    }
}
