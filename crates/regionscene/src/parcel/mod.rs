//! Land parcels of a region.
//!
//! Ownership is tracked on a grid of 4 m cells, each holding the local id
//! of the parcel that claims it. Parcel records keep their area and bounding
//! box in step with the grid.

mod overlay;
mod update;

use std::collections::BTreeMap;

use bitflags::bitflags;
use glam::Vec3;
use uuid::Uuid;

use crate::types::{Ugi, Ugui};

pub use overlay::{
    OVERLAY_AUCTION, OVERLAY_BORDER_SOUTH, OVERLAY_BORDER_WEST, OVERLAY_CHUNK_LEN,
    OVERLAY_FOR_SALE, OVERLAY_GROUP, OVERLAY_OTHER, OVERLAY_PUBLIC, OVERLAY_SELF, OverlayChunk,
    OverlayTracker, overlay_for,
};
pub use update::{ParcelPropertiesUpdate, ParcelUpdateListener};

/// Edge length of a parcel cell in metres.
pub const PARCEL_CELL_SIZE: u32 = 4;

bitflags! {
    /// Parcel options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParcelFlags: u32 {
        const ALLOW_FLY = 1 << 0;
        const ALLOW_OTHER_SCRIPTS = 1 << 1;
        const FOR_SALE = 1 << 2;
        const ALLOW_LANDMARK = 1 << 3;
        const ALLOW_TERRAFORM = 1 << 4;
        const ALLOW_DAMAGE = 1 << 5;
        const CREATE_OBJECTS = 1 << 6;
        const FOR_SALE_OBJECTS = 1 << 7;
        const USE_ACCESS_GROUP = 1 << 8;
        const USE_ACCESS_LIST = 1 << 9;
        const USE_BAN_LIST = 1 << 10;
        const USE_PASS_LIST = 1 << 11;
        const SHOW_DIRECTORY = 1 << 12;
        const ALLOW_DEED_TO_GROUP = 1 << 13;
        const CONTRIBUTE_WITH_DEED = 1 << 14;
        const SOUND_LOCAL = 1 << 15;
        const SELL_PARCEL_OBJECTS = 1 << 16;
        const ALLOW_PUBLISH = 1 << 17;
        const MATURE_PUBLISH = 1 << 18;
        const RESTRICT_PUSH_OBJECT = 1 << 21;
        const DENY_ANONYMOUS = 1 << 22;
        const ALLOW_GROUP_SCRIPTS = 1 << 25;
        const CREATE_GROUP_OBJECTS = 1 << 26;
        const ALLOW_ALL_OBJECT_ENTRY = 1 << 27;
        const ALLOW_GROUP_OBJECT_ENTRY = 1 << 28;
        const ALLOW_VOICE_CHAT = 1 << 29;
        const USE_ESTATE_VOICE_CHANNEL = 1 << 30;
    }
}

impl ParcelFlags {
    /// Options of a freshly claimed parcel.
    pub const DEFAULT: Self = Self::from_bits_retain(
        Self::ALLOW_FLY.bits()
            | Self::ALLOW_LANDMARK.bits()
            | Self::ALLOW_ALL_OBJECT_ENTRY.bits()
            | Self::ALLOW_DEED_TO_GROUP.bits()
            | Self::CREATE_OBJECTS.bits()
            | Self::ALLOW_OTHER_SCRIPTS.bits()
            | Self::SOUND_LOCAL.bits()
            | Self::ALLOW_VOICE_CHAT.bits(),
    );

    /// Bits that only someone allowed to sell the parcel may change.
    pub const SALE: Self =
        Self::from_bits_retain(Self::FOR_SALE.bits() | Self::SELL_PARCEL_OBJECTS.bits());
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParcelInfo {
    pub local_id: i32,
    pub global_id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: Ugui,
    pub group: Ugi,
    pub is_group_owned: bool,
    pub flags: ParcelFlags,
    pub sale_price: i32,
    pub auth_buyer: Uuid,
    pub auction_id: u32,
    /// Claimed area in square metres.
    pub area: u32,
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
    pub landing_point: Vec3,
    pub landing_look_at: Vec3,
    pub media_url: String,
    pub music_url: String,
    pub snapshot_id: Uuid,
    pub category: u8,
    pub pass_price: i32,
    pub pass_hours: f32,
}

impl ParcelInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, owner: Ugui) -> Self {
        Self {
            local_id: 0,
            global_id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            owner,
            group: Ugi::unknown(),
            is_group_owned: false,
            flags: ParcelFlags::DEFAULT,
            sale_price: 0,
            auth_buyer: Uuid::nil(),
            auction_id: 0,
            area: 0,
            aabb_min: Vec3::ZERO,
            aabb_max: Vec3::ZERO,
            landing_point: Vec3::ZERO,
            landing_look_at: Vec3::ZERO,
            media_url: String::new(),
            music_url: String::new(),
            snapshot_id: Uuid::nil(),
            category: 0,
            pass_price: 0,
            pass_hours: 0.0,
        }
    }

    /// A group-owned parcel is deeded to its group.
    #[must_use]
    pub fn is_owned_by(&self, agent: Uuid) -> bool {
        !self.is_group_owned && !agent.is_nil() && self.owner.id == agent
    }
}

/// The parcel grid of one region.
#[derive(Debug, Clone)]
pub struct ParcelMap {
    cells_x: usize,
    cells_y: usize,
    cells: Vec<i32>,
    parcels: BTreeMap<i32, ParcelInfo>,
    next_local_id: i32,
}

impl ParcelMap {
    /// A map whose every cell belongs to one parcel owned by `owner`.
    #[must_use]
    pub fn new(size_x: u32, size_y: u32, owner: Ugui) -> Self {
        let cells_x = (size_x / PARCEL_CELL_SIZE).max(1) as usize;
        let cells_y = (size_y / PARCEL_CELL_SIZE).max(1) as usize;
        let mut map = Self {
            cells_x,
            cells_y,
            cells: vec![0; cells_x * cells_y],
            parcels: BTreeMap::new(),
            next_local_id: 1,
        };
        let whole = ParcelInfo::new("Your Parcel", owner);
        let local_id = map.insert_record(whole);
        map.cells.fill(local_id);
        map.recompute_extents();
        map
    }

    #[must_use]
    pub fn cells_x(&self) -> usize {
        self.cells_x
    }

    #[must_use]
    pub fn cells_y(&self) -> usize {
        self.cells_y
    }

    /// Local id of the parcel claiming cell `(cx, cy)`.
    #[must_use]
    pub fn cell(&self, cx: usize, cy: usize) -> Option<i32> {
        (cx < self.cells_x && cy < self.cells_y).then(|| self.cells[cy * self.cells_x + cx])
    }

    fn insert_record(&mut self, mut info: ParcelInfo) -> i32 {
        let local_id = self.next_local_id;
        self.next_local_id += 1;
        info.local_id = local_id;
        self.parcels.insert(local_id, info);
        local_id
    }

    /// Claim the cells covering the metre rectangle `[west, east) x [south, north)`
    /// for a new parcel and return its local id. Parcels left without cells are
    /// removed.
    ///
    /// Returns `None` without touching the map when the rectangle covers no
    /// cell.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn add_parcel(
        &mut self,
        info: ParcelInfo,
        west: f32,
        south: f32,
        east: f32,
        north: f32,
    ) -> Option<i32> {
        let cell = PARCEL_CELL_SIZE as f32;
        let to_cell = |v: f32, limit: usize| ((v / cell).floor().max(0.0) as usize).min(limit);
        let (x0, x1) = (to_cell(west, self.cells_x), to_cell(east, self.cells_x));
        let (y0, y1) = (to_cell(south, self.cells_y), to_cell(north, self.cells_y));
        if x0 >= x1 || y0 >= y1 {
            tracing::debug!(name = %info.name, "parcel rectangle covers no cell");
            return None;
        }

        let local_id = self.insert_record(info);
        for cy in y0..y1 {
            for cx in x0..x1 {
                self.cells[cy * self.cells_x + cx] = local_id;
            }
        }
        self.recompute_extents();
        Some(local_id)
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn recompute_extents(&mut self) {
        let cell = PARCEL_CELL_SIZE as f32;
        let mut extents: BTreeMap<i32, (u32, Vec3, Vec3)> = BTreeMap::new();
        for cy in 0..self.cells_y {
            for cx in 0..self.cells_x {
                let id = self.cells[cy * self.cells_x + cx];
                let min = Vec3::new(cx as f32 * cell, cy as f32 * cell, 0.0);
                let max = min + Vec3::new(cell, cell, 0.0);
                let entry = extents.entry(id).or_insert((0, min, max));
                entry.0 += PARCEL_CELL_SIZE * PARCEL_CELL_SIZE;
                entry.1 = entry.1.min(min);
                entry.2 = entry.2.max(max);
            }
        }
        self.parcels.retain(|id, parcel| match extents.get(id) {
            Some(&(area, min, max)) => {
                parcel.area = area;
                parcel.aabb_min = min;
                parcel.aabb_max = max;
                true
            }
            None => {
                tracing::debug!(local_id = id, "parcel lost its last cell");
                false
            }
        });
    }

    /// Local id of the parcel under the metre position `(x, y)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn parcel_id_at(&self, x: f32, y: f32) -> Option<i32> {
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        let cell = PARCEL_CELL_SIZE as f32;
        self.cell((x / cell) as usize, (y / cell) as usize)
    }

    #[must_use]
    pub fn parcel_at(&self, position: Vec3) -> Option<&ParcelInfo> {
        self.parcel_id_at(position.x, position.y)
            .and_then(|id| self.parcels.get(&id))
    }

    #[must_use]
    pub fn parcel(&self, local_id: i32) -> Option<&ParcelInfo> {
        self.parcels.get(&local_id)
    }

    pub fn parcel_mut(&mut self, local_id: i32) -> Option<&mut ParcelInfo> {
        self.parcels.get_mut(&local_id)
    }

    pub fn parcels(&self) -> impl Iterator<Item = &ParcelInfo> {
        self.parcels.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }
}
