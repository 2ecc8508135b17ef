//! Viewer-requested parcel property changes.

use glam::Vec3;
use uuid::Uuid;

use super::{ParcelFlags, ParcelInfo};
use crate::permissions::GroupPowers;
use crate::types::Ugi;

/// Receives every parcel whose properties changed.
pub trait ParcelUpdateListener: Send + Sync {
    fn parcel_updated(&self, parcel: &ParcelInfo);
}

/// Requested changes; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParcelPropertiesUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub snapshot_id: Option<Uuid>,
    pub category: Option<u8>,
    pub flags: Option<ParcelFlags>,
    pub sale_price: Option<i32>,
    pub auth_buyer: Option<Uuid>,
    pub media_url: Option<String>,
    pub music_url: Option<String>,
    pub landing_point: Option<Vec3>,
    pub landing_look_at: Option<Vec3>,
    pub pass_price: Option<i32>,
    pub pass_hours: Option<f32>,
    pub group: Option<Uuid>,
}

impl ParcelPropertiesUpdate {
    /// Apply every field the caller may change and return how many changes
    /// were applied.
    ///
    /// `allowed` answers whether the caller holds a power over this parcel.
    /// Refused fields are skipped; sale bits and other option bits of
    /// `flags` are judged separately.
    pub fn apply_to(
        &self,
        parcel: &mut ParcelInfo,
        mut allowed: impl FnMut(GroupPowers) -> bool,
    ) -> usize {
        let local_id = parcel.local_id;
        let mut applied = 0;
        let mut permit = |power: GroupPowers, field: &'static str| {
            if allowed(power) {
                applied += 1;
                true
            } else {
                tracing::debug!(parcel = local_id, field, "parcel field change refused");
                false
            }
        };

        if let Some(name) = &self.name {
            if permit(GroupPowers::LAND_CHANGE_IDENTITY, "name") {
                parcel.name.clone_from(name);
            }
        }
        if let Some(description) = &self.description {
            if permit(GroupPowers::LAND_CHANGE_IDENTITY, "description") {
                parcel.description.clone_from(description);
            }
        }
        if let Some(snapshot) = self.snapshot_id {
            if permit(GroupPowers::LAND_CHANGE_IDENTITY, "snapshot") {
                parcel.snapshot_id = snapshot;
            }
        }
        if let Some(category) = self.category {
            if permit(GroupPowers::LAND_CHANGE_IDENTITY, "category") {
                parcel.category = category;
            }
        }
        if let Some(flags) = self.flags {
            let changed = parcel.flags.symmetric_difference(flags);
            let sale = changed & ParcelFlags::SALE;
            let options = changed.difference(ParcelFlags::SALE);
            let mut result = parcel.flags;
            if !sale.is_empty() && permit(GroupPowers::LAND_SET_SALE, "sale flags") {
                result.toggle(sale);
            }
            if !options.is_empty() && permit(GroupPowers::LAND_OPTIONS, "flags") {
                result.toggle(options);
            }
            parcel.flags = result;
        }
        if let Some(price) = self.sale_price {
            if permit(GroupPowers::LAND_SET_SALE, "sale price") {
                parcel.sale_price = price.max(0);
            }
        }
        if let Some(buyer) = self.auth_buyer {
            if permit(GroupPowers::LAND_SET_SALE, "authorized buyer") {
                parcel.auth_buyer = buyer;
            }
        }
        if let Some(url) = &self.media_url {
            if permit(GroupPowers::CHANGE_MEDIA, "media url") {
                parcel.media_url.clone_from(url);
            }
        }
        if let Some(url) = &self.music_url {
            if permit(GroupPowers::CHANGE_MEDIA, "music url") {
                parcel.music_url.clone_from(url);
            }
        }
        if let Some(point) = self.landing_point {
            if permit(GroupPowers::SET_LANDING_POINT, "landing point") {
                parcel.landing_point = point;
            }
        }
        if let Some(look_at) = self.landing_look_at {
            if permit(GroupPowers::SET_LANDING_POINT, "landing look-at") {
                parcel.landing_look_at = look_at;
            }
        }
        if let Some(price) = self.pass_price {
            if permit(GroupPowers::LAND_MANAGE_PASSES, "pass price") {
                parcel.pass_price = price.max(0);
            }
        }
        if let Some(hours) = self.pass_hours {
            if permit(GroupPowers::LAND_MANAGE_PASSES, "pass hours") {
                parcel.pass_hours = hours.max(0.0);
            }
        }
        if let Some(group) = self.group {
            if permit(GroupPowers::LAND_DEED, "group") {
                parcel.group = Ugi::from(group);
            }
        }
        applied
    }
}
