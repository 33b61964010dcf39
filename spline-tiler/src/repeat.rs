//! Single-part repeat mode: one mesh tiled over an interval of the path.

use crate::bend::bend_interval_part;
use crate::chunk::{ChunkAssembler, diff_chunks};
use crate::placement::MAX_SLOTS;
use crate::{
    BentPoint, BentVector, Chunk, ChunkDiff, ChunkId, FreeCoordinate, LENGTH_EPSILON, PartConfig,
    PathSampler, SampleCache, SourcePart, TilerError, TilerOptions,
};

/// The single-part sibling of [`crate::Tiler`]: repeats one part mesh over a
/// caller-set interval `[from, to]` of the path, with no placement policy.
///
/// Unlike the multi-part tiler, loop paths wrap out-of-range distances modulo
/// the path length, so geometry tiled across the seam of a closed spline
/// continues smoothly instead of bunching at the endpoint. On open paths the
/// final, partial copy is pinned to the interval end.
#[derive(Debug)]
pub struct RepeatTiler {
    options: TilerOptions,
    config: Option<PartConfig>,
    built_config: Option<PartConfig>,
    source: Option<SourcePart>,
    /// Validated sub-range of the path to fill; `None` means the whole path.
    interval: Option<(FreeCoordinate, FreeCoordinate)>,
    chunks: Vec<Chunk>,
    sample_cache: SampleCache,
    dirty: bool,
}

impl RepeatTiler {
    /// Creates an engine with no part configured. Starts dirty.
    pub fn new(options: TilerOptions) -> Self {
        Self {
            options,
            config: None,
            built_config: None,
            source: None,
            interval: None,
            chunks: Vec::new(),
            sample_cache: SampleCache::new(),
            dirty: true,
        }
    }

    /// Replaces the repeated part (or clears it), marking the engine dirty if it
    /// changed. Its placement rule, if any, is ignored.
    pub fn set_part(&mut self, config: Option<PartConfig>) {
        if self.config != config {
            self.config = config;
            self.mark_dirty();
        }
    }

    /// Restricts tiling to `[from, to]` along the path.
    ///
    /// The interval is checked against `path` immediately, before any state is
    /// touched: `from` must be at least 0, less than `to`, and `to` must not
    /// pass the end of the path.
    pub fn set_interval<P: PathSampler + ?Sized>(
        &mut self,
        from: FreeCoordinate,
        to: FreeCoordinate,
        path: &P,
    ) -> Result<(), TilerError> {
        let length = path.length();
        if !(from >= 0.0 && from < to && to <= length + LENGTH_EPSILON) {
            return Err(TilerError::IntervalOutOfRange { from, to, length });
        }
        let interval = Some((from, to.min(length)));
        if self.interval != interval {
            self.interval = interval;
            self.mark_dirty();
        }
        Ok(())
    }

    /// Removes the interval restriction, so the whole path is filled again.
    pub fn clear_interval(&mut self) {
        if self.interval.is_some() {
            self.interval = None;
            self.mark_dirty();
        }
    }

    /// Requests that the next [`Self::run_pass_if_dirty()`] runs a pass.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether a pass is pending.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The chunks published by the most recent successful pass.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Runs a pass if one is pending and a path is available; see
    /// [`crate::Tiler::run_pass_if_dirty()`], which this mirrors.
    pub fn run_pass_if_dirty<P: PathSampler + ?Sized>(
        &mut self,
        path: Option<&P>,
    ) -> Result<Option<ChunkDiff>, TilerError> {
        if !self.dirty {
            return Ok(None);
        }
        let Some(path) = path else {
            return Ok(None);
        };
        self.run_pass(path).map(Some)
    }

    fn run_pass<P: PathSampler + ?Sized>(&mut self, path: &P) -> Result<ChunkDiff, TilerError> {
        self.rebuild_source()?;

        self.sample_cache.clear();
        let mut assembler = ChunkAssembler::new(&self.options);
        if let Some(part) = &self.source {
            let length = path.length();
            let (from, to) = match self.interval {
                // The path may have shrunk since the interval was validated.
                Some((from, to)) => (from.min(length), to.min(length)),
                None => (0.0, length),
            };
            let span = to - from;
            if span > LENGTH_EPSILON {
                let copies = (span / part.arc_length()).ceil() as usize;
                let copies = copies.min(MAX_SLOTS);

                let mut positions: Vec<BentPoint> = Vec::new();
                let mut normals: Vec<BentVector> = Vec::new();
                for copy in 0..copies {
                    let offset = from + part.arc_length() * copy as FreeCoordinate;
                    bend_interval_part(
                        part,
                        offset,
                        (from, to),
                        path,
                        &mut self.sample_cache,
                        &mut positions,
                        &mut normals,
                    );
                    assembler.append_part(0, part, part.arc_length(), &positions, &normals);
                }
            }
        }
        let chunks = assembler.finish();

        let previous_ids: Vec<ChunkId> = self.chunks.iter().map(Chunk::id).collect();
        let current_ids: Vec<ChunkId> = chunks.iter().map(Chunk::id).collect();
        let diff = diff_chunks(&previous_ids, &current_ids);

        self.chunks = chunks;
        self.dirty = false;
        Ok(diff)
    }

    fn rebuild_source(&mut self) -> Result<(), TilerError> {
        if self.built_config == self.config {
            return Ok(());
        }
        self.source = match &self.config {
            Some(config) => Some(SourcePart::build(config, 0)?),
            None => None,
        };
        self.built_config = self.config.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ArcPath, LinePath, ribbon_config};
    use crate::{MaterialId, Placement};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const PATH: LinePath = LinePath { length: 10.0 };

    fn repeat_with_part(length: FreeCoordinate) -> RepeatTiler {
        let mut tiler = RepeatTiler::new(TilerOptions::default());
        tiler.set_part(Some(ribbon_config(length, MaterialId(0), Placement::None)));
        tiler
    }

    #[rstest]
    #[case(-1.0, 5.0)]
    #[case(5.0, 5.0)]
    #[case(6.0, 2.0)]
    #[case(0.0, 11.0)]
    fn bad_intervals_are_rejected_before_any_mutation(
        #[case] from: FreeCoordinate,
        #[case] to: FreeCoordinate,
    ) {
        let mut tiler = repeat_with_part(3.0);
        tiler.run_pass_if_dirty(Some(&PATH)).unwrap();
        assert!(!tiler.is_dirty());

        assert_eq!(
            tiler.set_interval(from, to, &PATH),
            Err(TilerError::IntervalOutOfRange {
                from,
                to,
                length: 10.0
            })
        );
        assert!(!tiler.is_dirty(), "rejected interval must not dirty state");
        assert_eq!(tiler.interval, None);
    }

    #[test]
    fn fills_the_interval_and_pins_the_final_copy() {
        let mut tiler = repeat_with_part(3.0);
        tiler.set_interval(2.0, 10.0, &PATH).unwrap();
        tiler.run_pass_if_dirty(Some(&PATH)).unwrap();

        let chunk = &tiler.chunks()[0];
        // ceil(8 / 3) = 3 copies of the 4-vertex ribbon.
        assert_eq!(chunk.vertex_count(), 12);
        // First copy starts at the interval start, not the path start.
        assert_eq!(chunk.positions()[0].x, 2.0);
        // The third copy would reach distance 11; it is pinned to the interval end.
        assert_eq!(chunk.positions()[10].x, 10.0);
    }

    #[test]
    fn loop_paths_wrap_instead_of_clamping() {
        let path = ArcPath {
            radius: 2.0,
            turns: 1.0,
            looped: true,
        };
        let length = path.length();
        let part_length = length * 0.75;

        let mut tiler = repeat_with_part(part_length);
        tiler.run_pass_if_dirty(Some(&path)).unwrap();

        let chunk = &tiler.chunks()[0];
        assert_eq!(chunk.vertex_count(), 8);
        // The second copy's far edge lands at nominal distance 1.5 × length,
        // which wraps to 0.5 × length instead of pinning to the end.
        let expected = path
            .sample(0.5 * length)
            .bend_point(crate::PartVector::new(0.0, -0.5, 0.0));
        let actual = chunk.positions()[6];
        assert!((actual - expected).length() < 1e-9, "{actual:?} vs {expected:?}");
    }

    #[test]
    fn whole_path_is_used_when_no_interval_is_set() {
        let mut tiler = repeat_with_part(5.0);
        tiler.run_pass_if_dirty(Some(&PATH)).unwrap();
        assert_eq!(tiler.chunks()[0].vertex_count(), 8);
        assert_eq!(tiler.chunks()[0].length(), 10.0);
    }

    #[test]
    fn clearing_the_part_removes_the_chunks() {
        let mut tiler = repeat_with_part(5.0);
        tiler.run_pass_if_dirty(Some(&PATH)).unwrap();
        tiler.set_part(None);
        let diff = tiler.run_pass_if_dirty(Some(&PATH)).unwrap().unwrap();
        assert!(tiler.chunks().is_empty());
        assert_eq!(diff.removed.len(), 1);
    }
}
