//! The per-cell land overlay viewers draw over the map.

use uuid::Uuid;

use super::{ParcelFlags, ParcelMap};
use crate::permissions::GroupsService;

pub const OVERLAY_PUBLIC: u8 = 0;
pub const OVERLAY_OTHER: u8 = 1;
pub const OVERLAY_GROUP: u8 = 2;
pub const OVERLAY_SELF: u8 = 3;
pub const OVERLAY_FOR_SALE: u8 = 4;
pub const OVERLAY_AUCTION: u8 = 5;
pub const OVERLAY_BORDER_WEST: u8 = 0x40;
pub const OVERLAY_BORDER_SOUTH: u8 = 0x80;

/// Bytes per overlay message.
pub const OVERLAY_CHUNK_LEN: usize = 1024;

/// One cell byte per 4 m cell, row-major from the south-west corner, as seen
/// by `agent`.
#[must_use]
pub fn overlay_for(map: &ParcelMap, agent: Uuid, groups: &dyn GroupsService) -> Vec<u8> {
    let mut overlay = Vec::with_capacity(map.cells_x() * map.cells_y());
    for cy in 0..map.cells_y() {
        for cx in 0..map.cells_x() {
            let Some(id) = map.cell(cx, cy) else {
                overlay.push(OVERLAY_PUBLIC);
                continue;
            };
            let mut byte = map
                .parcel(id)
                .map_or(OVERLAY_PUBLIC, |parcel| {
                    if parcel.is_owned_by(agent) {
                        OVERLAY_SELF
                    } else if parcel.auction_id != 0 {
                        OVERLAY_AUCTION
                    } else if parcel.flags.contains(ParcelFlags::FOR_SALE) {
                        OVERLAY_FOR_SALE
                    } else if parcel.is_group_owned && groups.is_member(parcel.group.id, agent) {
                        OVERLAY_GROUP
                    } else if parcel.owner.is_unknown() {
                        OVERLAY_PUBLIC
                    } else {
                        OVERLAY_OTHER
                    }
                });
            if cx == 0 || map.cell(cx - 1, cy) != Some(id) {
                byte |= OVERLAY_BORDER_WEST;
            }
            if cy == 0 || map.cell(cx, cy - 1) != Some(id) {
                byte |= OVERLAY_BORDER_SOUTH;
            }
            overlay.push(byte);
        }
    }
    overlay
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayChunk {
    pub sequence_id: usize,
    pub data: Vec<u8>,
}

/// Remembers the overlay last sent to one viewer and yields only the chunks
/// that changed since.
#[derive(Debug, Clone, Default)]
pub struct OverlayTracker {
    last_sent: Option<Vec<u8>>,
}

impl OverlayTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget what was sent; the next diff yields every chunk.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }

    pub fn diff(&mut self, overlay: &[u8]) -> Vec<OverlayChunk> {
        let previous = self
            .last_sent
            .as_deref()
            .filter(|last| last.len() == overlay.len());
        let chunks = overlay
            .chunks(OVERLAY_CHUNK_LEN)
            .enumerate()
            .filter(|(index, chunk)| {
                previous.is_none_or(|last| {
                    let start = index * OVERLAY_CHUNK_LEN;
                    &last[start..start + chunk.len()] != *chunk
                })
            })
            .map(|(sequence_id, chunk)| OverlayChunk {
                sequence_id,
                data: chunk.to_vec(),
            })
            .collect();
        self.last_sent = Some(overlay.to_vec());
        chunks
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::parcel::ParcelInfo;
    use crate::permissions::{GroupPowers, InMemoryGroups};
    use crate::types::Ugui;

    #[test]
    fn test_overlay_ownership_and_borders() {
        let me = Uuid::from_u128(1);
        let mut map = ParcelMap::new(256, 256, Ugui::from(Uuid::from_u128(2)));
        map.add_parcel(ParcelInfo::new("Mine", Ugui::from(me)), 0.0, 0.0, 16.0, 16.0);
        let groups = InMemoryGroups::new();
        let overlay = overlay_for(&map, me, &groups);

        assert_eq!(overlay.len(), 64 * 64);
        assert_eq!(overlay[0], OVERLAY_SELF | OVERLAY_BORDER_WEST | OVERLAY_BORDER_SOUTH);
        assert_eq!(overlay[1], OVERLAY_SELF | OVERLAY_BORDER_SOUTH);
        assert_eq!(overlay[64 + 1], OVERLAY_SELF);
        // First cell of the neighbouring parcel starts a west border.
        assert_eq!(overlay[4], OVERLAY_OTHER | OVERLAY_BORDER_SOUTH | OVERLAY_BORDER_WEST);
        assert_eq!(overlay[5], OVERLAY_OTHER | OVERLAY_BORDER_SOUTH);
    }

    #[test]
    fn test_group_overlay_needs_membership() {
        let me = Uuid::from_u128(1);
        let group = Uuid::from_u128(50);
        let mut map = ParcelMap::new(64, 64, Ugui::from(group));
        if let Some(parcel) = map.parcel_mut(1) {
            parcel.is_group_owned = true;
            parcel.group = group.into();
        }
        let groups = InMemoryGroups::new();
        assert_eq!(overlay_for(&map, me, &groups)[17] & 0x3f, OVERLAY_OTHER);
        groups.set_member(group, me, GroupPowers::empty());
        assert_eq!(overlay_for(&map, me, &groups)[17] & 0x3f, OVERLAY_GROUP);
    }

    #[test]
    fn test_tracker_sends_changed_chunks_only() {
        let mut map = ParcelMap::new(256, 256, Ugui::unknown());
        let groups = InMemoryGroups::new();
        let viewer = Uuid::from_u128(9);
        let mut tracker = OverlayTracker::new();

        let first = tracker.diff(&overlay_for(&map, viewer, &groups));
        assert_eq!(first.len(), 4);
        assert!(tracker.diff(&overlay_for(&map, viewer, &groups)).is_empty());

        // A parcel in the north-east corner only touches the last chunk.
        map.add_parcel(ParcelInfo::new("Corner", Ugui::from(viewer)), 240.0, 240.0, 256.0, 256.0);
        assert!(map.parcel_at(Vec3::new(250.0, 250.0, 0.0)).is_some());
        let changed = tracker.diff(&overlay_for(&map, viewer, &groups));
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].sequence_id, 3);
        assert_eq!(changed[0].data.len(), OVERLAY_CHUNK_LEN);

        tracker.reset();
        assert_eq!(tracker.diff(&overlay_for(&map, viewer, &groups)).len(), 4);
    }
}
