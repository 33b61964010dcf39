//! The tiling engine: owns configuration and caches, runs passes.

use crate::bend::bend_part;
use crate::chunk::{ChunkAssembler, diff_chunks};
use crate::placement::select_placements;
use crate::{
    BentPoint, BentVector, Chunk, ChunkDiff, ChunkId, PartConfig, PathSampler, Placements,
    SampleCache, SourcePart, TilerError, TilerOptions,
};

/// Tiles a configured list of parts along a path and maintains the resulting
/// chunk set across configuration and path changes.
///
/// The engine is driven explicitly: anything that invalidates the output (a
/// path edit, a config edit the engine cannot see) calls [`Self::mark_dirty()`],
/// and the host calls [`Self::run_pass_if_dirty()`] from its own update cadence
/// (frame tick, timer, or manual). Redundant triggers coalesce into a single
/// pending pass. A pass runs to completion before returning; partially bent
/// geometry is never published.
#[derive(Debug)]
pub struct Tiler {
    options: TilerOptions,
    configs: Vec<PartConfig>,

    /// Configs the corresponding `source_parts` entries were built from.
    /// An entry is rebuilt only when its config no longer compares equal.
    built_configs: Vec<PartConfig>,
    source_parts: Vec<SourcePart>,

    placements: Placements,
    chunks: Vec<Chunk>,
    sample_cache: SampleCache,
    dirty: bool,
}

impl Tiler {
    /// Creates an engine with no parts configured. The engine starts dirty, so
    /// the first [`Self::run_pass_if_dirty()`] with a path will run a pass.
    pub fn new(options: TilerOptions) -> Self {
        Self {
            options,
            configs: Vec::new(),
            built_configs: Vec::new(),
            source_parts: Vec::new(),
            placements: Placements::empty(),
            chunks: Vec::new(),
            sample_cache: SampleCache::new(),
            dirty: true,
        }
    }

    /// The options the last pass ran with (or will run with).
    pub fn options(&self) -> &TilerOptions {
        &self.options
    }

    /// Replaces the options, marking the engine dirty if they changed.
    pub fn set_options(&mut self, options: TilerOptions) {
        if self.options != options {
            self.options = options;
            self.mark_dirty();
        }
    }

    /// The configured part list.
    pub fn parts(&self) -> &[PartConfig] {
        &self.configs
    }

    /// Replaces the part list, marking the engine dirty if it changed.
    pub fn set_parts(&mut self, configs: Vec<PartConfig>) {
        if self.configs != configs {
            self.configs = configs;
            self.mark_dirty();
        }
    }

    /// Requests that the next [`Self::run_pass_if_dirty()`] runs a pass.
    ///
    /// Call this from path-changed notifications. Calling it repeatedly before
    /// the next pass is free; triggers coalesce.
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

    /// The slot decisions of the most recent successful pass.
    pub fn placements(&self) -> &Placements {
        &self.placements
    }

    /// The source-part snapshots the most recent pass placed;
    /// [`Placements::slots`] indexes into this.
    pub fn source_parts(&self) -> &[SourcePart] {
        &self.source_parts
    }

    /// Runs a full tiling pass if one is pending and a path is available.
    ///
    /// Returns `Ok(None)` when nothing was done: either no pass was pending, or
    /// `path` is [`None`] (incomplete setup; the pending pass stays queued until
    /// a path appears). On success, returns the chunk-set changes for the host to
    /// apply to its renderer resources; [`Self::chunks()`] holds the new set.
    ///
    /// On error (a configuration problem such as a zero-length part) the
    /// previously published chunks are left untouched and the pass stays
    /// pending, so fixing the configuration and calling again recovers.
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
        self.rebuild_source_parts()?;

        let placements = select_placements(
            &self.source_parts,
            path.length(),
            self.options.seed,
            self.options.stretch_to_fit,
        );

        self.sample_cache.clear();
        let mut assembler = ChunkAssembler::new(&self.options);
        let mut positions: Vec<BentPoint> = Vec::new();
        let mut normals: Vec<BentVector> = Vec::new();
        let mut running_offset = 0.0;
        for &slot in &placements.slots {
            let part = &self.source_parts[slot];
            bend_part(
                part,
                placements.scale,
                running_offset,
                path,
                &mut self.sample_cache,
                &mut positions,
                &mut normals,
            );
            let scaled_length = part.arc_length() * placements.scale;
            assembler.append_part(slot, part, scaled_length, &positions, &normals);
            running_offset += scaled_length;
        }
        let chunks = assembler.finish();

        let previous_ids: Vec<ChunkId> = self.chunks.iter().map(Chunk::id).collect();
        let current_ids: Vec<ChunkId> = chunks.iter().map(Chunk::id).collect();
        let diff = diff_chunks(&previous_ids, &current_ids);

        log::trace!(
            "tiling pass: {slots} slots over length {length}, {chunks} chunks \
             ({created} created, {removed} removed), {samples} path samples",
            slots = placements.slots.len(),
            length = path.length(),
            chunks = chunks.len(),
            created = diff.created.len(),
            removed = diff.removed.len(),
            samples = self.sample_cache.len(),
        );

        self.chunks = chunks;
        self.placements = placements;
        self.dirty = false;
        Ok(diff)
    }

    /// Refreshes the source-part arena from the config list, rebuilding only the
    /// entries whose configs changed since they were last built.
    fn rebuild_source_parts(&mut self) -> Result<(), TilerError> {
        for (index, config) in self.configs.iter().enumerate() {
            if self.built_configs.get(index) == Some(config) {
                continue;
            }
            match SourcePart::build(config, index) {
                Ok(part) => {
                    if index < self.source_parts.len() {
                        self.source_parts[index] = part;
                        self.built_configs[index] = config.clone();
                    } else {
                        self.source_parts.push(part);
                        self.built_configs.push(config.clone());
                    }
                }
                Err(error) => {
                    // Entries past this point are stale; drop them so the cache
                    // never claims a config it failed to build.
                    self.source_parts.truncate(index);
                    self.built_configs.truncate(index);
                    return Err(error);
                }
            }
        }
        self.source_parts.truncate(self.configs.len());
        self.built_configs.truncate(self.configs.len());
        Ok(())
    }
}
