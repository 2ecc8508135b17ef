//! The region heightmap.
//!
//! Heights are stored row-major in metres, one sample per metre. The map is
//! split into 16x16 patches that are versioned independently: cell writes
//! only mark patches dirty, and [`TerrainMap::flush_dirty`] turns the dirty
//! set into serial increments and one listener notification.

use std::panic::{AssertUnwindSafe, catch_unwind};

use parking_lot::{Mutex, RwLock};

use crate::observer::ObserverList;

/// Edge length of a terrain patch in cells.
pub const TERRAIN_PATCH_SIZE: usize = 16;

/// A patch whose serial was incremented by a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchChange {
    pub x: usize,
    pub y: usize,
    pub serial: u32,
}

/// Heights of one patch, as pushed to viewers.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainPatch {
    pub x: usize,
    pub y: usize,
    pub serial: u32,
    /// Row-major, `TERRAIN_PATCH_SIZE` squared samples.
    pub heights: Vec<f32>,
}

/// Called once per flush with every patch that changed.
pub type TerrainListener = dyn Fn(&[PatchChange]) + Send + Sync;

struct Heights {
    current: Vec<f32>,
    baked: Vec<f32>,
}

struct Patches {
    serials: Vec<u32>,
    dirty: Vec<bool>,
}

pub struct TerrainMap {
    size_x: usize,
    size_y: usize,
    heights: RwLock<Heights>,
    patches: Mutex<Patches>,
    listeners: ObserverList<TerrainListener>,
}

impl std::fmt::Debug for TerrainMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainMap")
            .field("size_x", &self.size_x)
            .field("size_y", &self.size_y)
            .finish_non_exhaustive()
    }
}

impl TerrainMap {
    /// A flat map. Sizes are rounded up to whole patches.
    #[must_use]
    pub fn new(size_x: usize, size_y: usize, height: f32) -> Self {
        let size_x = size_x.max(1).div_ceil(TERRAIN_PATCH_SIZE) * TERRAIN_PATCH_SIZE;
        let size_y = size_y.max(1).div_ceil(TERRAIN_PATCH_SIZE) * TERRAIN_PATCH_SIZE;
        let patch_count = (size_x / TERRAIN_PATCH_SIZE) * (size_y / TERRAIN_PATCH_SIZE);
        let heights = vec![height; size_x * size_y];
        Self {
            size_x,
            size_y,
            heights: RwLock::new(Heights {
                baked: heights.clone(),
                current: heights,
            }),
            patches: Mutex::new(Patches {
                serials: vec![0; patch_count],
                dirty: vec![false; patch_count],
            }),
            listeners: ObserverList::default(),
        }
    }

    #[must_use]
    pub fn size_x(&self) -> usize {
        self.size_x
    }

    #[must_use]
    pub fn size_y(&self) -> usize {
        self.size_y
    }

    #[must_use]
    pub fn patches_x(&self) -> usize {
        self.size_x / TERRAIN_PATCH_SIZE
    }

    #[must_use]
    pub fn patches_y(&self) -> usize {
        self.size_y / TERRAIN_PATCH_SIZE
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y.min(self.size_y - 1) * self.size_x + x.min(self.size_x - 1)
    }

    fn patch_index(&self, x: usize, y: usize) -> usize {
        (y / TERRAIN_PATCH_SIZE) * self.patches_x() + x / TERRAIN_PATCH_SIZE
    }

    /// Height at a cell; coordinates past the edge read the edge.
    #[must_use]
    pub fn height(&self, x: usize, y: usize) -> f32 {
        self.heights.read().current[self.index(x, y)]
    }

    /// Height the map had when last baked.
    #[must_use]
    pub fn baked_height(&self, x: usize, y: usize) -> f32 {
        self.heights.read().baked[self.index(x, y)]
    }

    /// Replace one cell's height through `f(current, baked)`.
    ///
    /// The read and write are atomic for the cell. Returns whether the
    /// height changed; only then is the cell's patch marked dirty.
    pub fn adjust_terrain(&self, x: usize, y: usize, f: impl FnOnce(f32, f32) -> f32) -> bool {
        if x >= self.size_x || y >= self.size_y {
            return false;
        }
        let index = self.index(x, y);
        let changed = {
            let mut heights = self.heights.write();
            let old = heights.current[index];
            let new = f(old, heights.baked[index]);
            if !new.is_finite() || new == old {
                false
            } else {
                heights.current[index] = new;
                true
            }
        };
        if changed {
            let patch = self.patch_index(x, y);
            self.patches.lock().dirty[patch] = true;
        }
        changed
    }

    pub fn set_height(&self, x: usize, y: usize, height: f32) -> bool {
        self.adjust_terrain(x, y, |_, _| height)
    }

    /// Bilinear sample at a fractional position, clamped to the map.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn bilinear(&self, x: f32, y: f32) -> f32 {
        let max_x = (self.size_x - 1) as f32;
        let max_y = (self.size_y - 1) as f32;
        let x = if x.is_finite() { x.clamp(0.0, max_x) } else { 0.0 };
        let y = if y.is_finite() { y.clamp(0.0, max_y) } else { 0.0 };

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.size_x - 1);
        let y1 = (y0 + 1).min(self.size_y - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let heights = self.heights.read();
        let at = |cx: usize, cy: usize| heights.current[cy * self.size_x + cx];
        let south = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
        let north = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
        south * (1.0 - fy) + north * fy
    }

    /// Make the current heights the revert target.
    pub fn bake(&self) {
        let mut heights = self.heights.write();
        let current = heights.current.clone();
        heights.baked = current;
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<f32> {
        self.heights.read().current.clone()
    }

    #[must_use]
    pub fn patch_serial(&self, px: usize, py: usize) -> u32 {
        let index = py.min(self.patches_y() - 1) * self.patches_x() + px.min(self.patches_x() - 1);
        self.patches.lock().serials[index]
    }

    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.patches.lock().dirty.iter().filter(|d| **d).count()
    }

    /// Current heights and serial of one patch.
    #[must_use]
    pub fn patch(&self, px: usize, py: usize) -> TerrainPatch {
        let serial = self.patch_serial(px, py);
        let heights = self.heights.read();
        let mut samples = Vec::with_capacity(TERRAIN_PATCH_SIZE * TERRAIN_PATCH_SIZE);
        for y in 0..TERRAIN_PATCH_SIZE {
            let row = self.index(px * TERRAIN_PATCH_SIZE, py * TERRAIN_PATCH_SIZE + y);
            samples.extend_from_slice(&heights.current[row..row + TERRAIN_PATCH_SIZE]);
        }
        TerrainPatch {
            x: px,
            y: py,
            serial,
            heights: samples,
        }
    }

    #[must_use]
    pub fn on_patches_changed(&self) -> &ObserverList<TerrainListener> {
        &self.listeners
    }

    /// Increment the serial of every dirty patch, clear the dirty set and
    /// notify listeners once. Returns the changes; empty when nothing was
    /// dirty, in which case listeners are not called.
    pub fn flush_dirty(&self) -> Vec<PatchChange> {
        let changes: Vec<PatchChange> = {
            let mut patches = self.patches.lock();
            let patches_x = self.patches_x();
            let Patches { serials, dirty } = &mut *patches;
            dirty
                .iter_mut()
                .zip(serials.iter_mut())
                .enumerate()
                .filter(|(_, (dirty, _))| **dirty)
                .map(|(index, (dirty, serial))| {
                    *dirty = false;
                    *serial = serial.wrapping_add(1);
                    PatchChange {
                        x: index % patches_x,
                        y: index / patches_x,
                        serial: *serial,
                    }
                })
                .collect()
        };
        if changes.is_empty() {
            return changes;
        }
        tracing::debug!(patches = changes.len(), "terrain patches changed");
        for listener in self.listeners.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| listener(&changes))).is_err() {
                tracing::warn!("terrain listener panicked");
            }
        }
        changes
    }
}
