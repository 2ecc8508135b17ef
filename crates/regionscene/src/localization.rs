//! Per-culture presentation data of a part.
//!
//! Every part carries a default localization with concrete values and any
//! number of named localizations that override individual properties. Each
//! localization owns a cache of the viewer update buffers derived from it.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use primshape::{TextureAnimation, TextureEntry};
use uuid::Uuid;

/// Floating hover text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextParams {
    pub text: String,
    pub color: Vec3,
    pub alpha: f32,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: Vec3::ONE,
            alpha: 1.0,
        }
    }
}

/// Looped sound attached to a part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundParams {
    pub sound_id: Uuid,
    pub gain: f32,
    pub radius: f32,
    pub flags: u8,
}

impl Default for SoundParams {
    fn default() -> Self {
        Self {
            sound_id: Uuid::nil(),
            gain: 0.0,
            radius: 0.0,
            flags: 0,
        }
    }
}

/// A localizable sub-property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalizedProperty {
    Name,
    Description,
    SitText,
    TouchText,
    Text,
    Sound,
    TextureEntry,
    TextureAnimation,
    MediaUrl,
    ParticleSystem,
}

/// Which localizations a setter targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CultureSelector<'a> {
    /// The default localization.
    Default,
    /// One named localization, created on demand.
    Named(&'a str),
    /// The default plus every named localization already overriding the
    /// property being set.
    All,
}

impl<'a> CultureSelector<'a> {
    /// `None` and the empty string select the default, `"*"` selects all.
    #[must_use]
    pub fn parse(culture: Option<&'a str>) -> Self {
        match culture {
            None | Some("") => Self::Default,
            Some("*") => Self::All,
            Some(name) => Self::Named(name),
        }
    }
}

/// The kinds of cached viewer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Full,
    Terse,
    Compressed,
    Properties,
}

#[derive(Default)]
struct CachedBuffers {
    entries: [Option<(u32, Arc<Vec<u8>>)>; 4],
}

/// Serial-keyed cache of derived update buffers.
///
/// Clones start empty; the cache belongs to one localization instance.
#[derive(Default)]
pub struct UpdateBufferCache {
    inner: Mutex<CachedBuffers>,
}

impl Clone for UpdateBufferCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for UpdateBufferCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateBufferCache").finish_non_exhaustive()
    }
}

impl UpdateBufferCache {
    /// Return the cached buffer for `serial`, building it when the cached
    /// one was derived from a different serial.
    pub fn get_or_build(
        &self,
        kind: UpdateKind,
        serial: u32,
        build: impl FnOnce() -> Vec<u8>,
    ) -> Arc<Vec<u8>> {
        let index = kind as usize;
        let mut inner = self.inner.lock();
        if let Some((cached_serial, buffer)) = &inner.entries[index] {
            if *cached_serial == serial {
                return Arc::clone(buffer);
            }
        }
        let buffer = Arc::new(build());
        inner.entries[index] = Some((serial, Arc::clone(&buffer)));
        buffer
    }

    pub fn invalidate(&self) {
        *self.inner.lock() = CachedBuffers::default();
    }
}

/// Presentation data for one culture. `None` means "inherit the default".
#[derive(Debug, Clone, Default)]
pub struct ObjectPartLocalizedInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sit_text: Option<String>,
    pub touch_text: Option<String>,
    pub text: Option<TextParams>,
    pub sound: Option<SoundParams>,
    pub texture_entry: Option<TextureEntry>,
    pub texture_animation: Option<TextureAnimation>,
    pub media_url: Option<String>,
    pub particle_system: Option<Vec<u8>>,
    cache: UpdateBufferCache,
}

impl ObjectPartLocalizedInfo {
    /// A localization with every property set, as the default carries.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            name: Some("Primitive".to_owned()),
            description: Some(String::new()),
            sit_text: Some(String::new()),
            touch_text: Some(String::new()),
            text: Some(TextParams::default()),
            sound: Some(SoundParams::default()),
            texture_entry: Some(TextureEntry::default()),
            texture_animation: Some(TextureAnimation::default()),
            media_url: Some(String::new()),
            particle_system: Some(Vec::new()),
            cache: UpdateBufferCache::default(),
        }
    }

    #[must_use]
    pub fn has_override(&self, property: LocalizedProperty) -> bool {
        match property {
            LocalizedProperty::Name => self.name.is_some(),
            LocalizedProperty::Description => self.description.is_some(),
            LocalizedProperty::SitText => self.sit_text.is_some(),
            LocalizedProperty::TouchText => self.touch_text.is_some(),
            LocalizedProperty::Text => self.text.is_some(),
            LocalizedProperty::Sound => self.sound.is_some(),
            LocalizedProperty::TextureEntry => self.texture_entry.is_some(),
            LocalizedProperty::TextureAnimation => self.texture_animation.is_some(),
            LocalizedProperty::MediaUrl => self.media_url.is_some(),
            LocalizedProperty::ParticleSystem => self.particle_system.is_some(),
        }
    }

    /// Whether nothing is overridden.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [
            LocalizedProperty::Name,
            LocalizedProperty::Description,
            LocalizedProperty::SitText,
            LocalizedProperty::TouchText,
            LocalizedProperty::Text,
            LocalizedProperty::Sound,
            LocalizedProperty::TextureEntry,
            LocalizedProperty::TextureAnimation,
            LocalizedProperty::MediaUrl,
            LocalizedProperty::ParticleSystem,
        ]
        .into_iter()
        .all(|p| !self.has_override(p))
    }

    #[must_use]
    pub fn cache(&self) -> &UpdateBufferCache {
        &self.cache
    }
}

/// The default localization plus named overrides, keyed by culture.
#[derive(Debug, Clone)]
pub struct Localizations {
    default: ObjectPartLocalizedInfo,
    named: BTreeMap<String, ObjectPartLocalizedInfo>,
}

impl Default for Localizations {
    fn default() -> Self {
        Self {
            default: ObjectPartLocalizedInfo::with_defaults(),
            named: BTreeMap::new(),
        }
    }
}

impl Localizations {
    #[must_use]
    pub fn default_info(&self) -> &ObjectPartLocalizedInfo {
        &self.default
    }

    pub fn default_info_mut(&mut self) -> &mut ObjectPartLocalizedInfo {
        &mut self.default
    }

    #[must_use]
    pub fn get(&self, culture: &str) -> Option<&ObjectPartLocalizedInfo> {
        self.named.get(culture)
    }

    pub fn get_or_insert(&mut self, culture: &str) -> &mut ObjectPartLocalizedInfo {
        self.named.entry(culture.to_owned()).or_default()
    }

    /// Returns whether the culture existed.
    pub fn remove(&mut self, culture: &str) -> bool {
        self.named.remove(culture).is_some()
    }

    pub fn remove_all(&mut self) {
        self.named.clear();
    }

    pub fn cultures(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    /// The localization whose cache serves `culture`: the named one when it
    /// exists, otherwise the default.
    #[must_use]
    pub fn resolve(&self, culture: Option<&str>) -> &ObjectPartLocalizedInfo {
        culture
            .and_then(|c| self.named.get(c))
            .unwrap_or(&self.default)
    }

    /// Effective values for `culture`.
    #[must_use]
    pub fn view(&self, culture: Option<&str>) -> LocalizedView<'_> {
        LocalizedView {
            named: culture.and_then(|c| self.named.get(c)),
            default: &self.default,
        }
    }

    /// Apply `f` to every localization the selector targets for `property`.
    ///
    /// Named localizations that do not already override `property` are left
    /// alone under [`CultureSelector::All`].
    pub fn update(
        &mut self,
        selector: CultureSelector<'_>,
        property: LocalizedProperty,
        mut f: impl FnMut(&mut ObjectPartLocalizedInfo),
    ) {
        match selector {
            CultureSelector::Default => f(&mut self.default),
            CultureSelector::Named(culture) => f(self.get_or_insert(culture)),
            CultureSelector::All => {
                f(&mut self.default);
                for info in self.named.values_mut() {
                    if info.has_override(property) {
                        f(info);
                    }
                }
            }
        }
    }

    /// Drop every cached buffer.
    pub fn invalidate_caches(&self) {
        self.default.cache.invalidate();
        for info in self.named.values() {
            info.cache.invalidate();
        }
    }
}

/// Read-only view resolving each property against the default.
#[derive(Debug, Clone, Copy)]
pub struct LocalizedView<'a> {
    named: Option<&'a ObjectPartLocalizedInfo>,
    default: &'a ObjectPartLocalizedInfo,
}

macro_rules! view_getter {
    ($name:ident, $ty:ty) => {
        #[must_use]
        pub fn $name(&self) -> $ty {
            self.named
                .and_then(|n| n.$name.as_ref())
                .or(self.default.$name.as_ref())
                .cloned()
                .unwrap_or_default()
        }
    };
}

impl LocalizedView<'_> {
    view_getter!(name, String);
    view_getter!(description, String);
    view_getter!(sit_text, String);
    view_getter!(touch_text, String);
    view_getter!(text, TextParams);
    view_getter!(sound, SoundParams);
    view_getter!(texture_entry, TextureEntry);
    view_getter!(texture_animation, TextureAnimation);
    view_getter!(media_url, String);
    view_getter!(particle_system, Vec<u8>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_falls_back_to_default() {
        let mut locs = Localizations::default();
        locs.default_info_mut().name = Some("Chair".into());
        locs.get_or_insert("de").description = Some("Stuhl zum Sitzen".into());

        let view = locs.view(Some("de"));
        assert_eq!(view.name(), "Chair");
        assert_eq!(view.description(), "Stuhl zum Sitzen");
        // Unknown cultures read the default.
        assert_eq!(locs.view(Some("fr")).description(), "");
    }

    #[test]
    fn test_all_selector_respects_overrides() {
        let mut locs = Localizations::default();
        locs.get_or_insert("de").name = Some("Stuhl".into());
        locs.get_or_insert("fr").description = Some("chaise".into());

        locs.update(CultureSelector::All, LocalizedProperty::Name, |info| {
            info.name = Some("Seat".into());
        });

        assert_eq!(locs.view(None).name(), "Seat");
        assert_eq!(locs.get("de").unwrap().name.as_deref(), Some("Seat"));
        // fr never overrode the name, so it keeps inheriting.
        assert_eq!(locs.get("fr").unwrap().name, None);
    }

    #[test]
    fn test_named_selector_creates() {
        let mut locs = Localizations::default();
        locs.update(
            CultureSelector::parse(Some("ja")),
            LocalizedProperty::SitText,
            |info| info.sit_text = Some("座る".into()),
        );
        assert_eq!(locs.cultures().collect::<Vec<_>>(), vec!["ja"]);
        assert!(locs.remove("ja"));
        assert!(!locs.remove("ja"));
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!(CultureSelector::parse(None), CultureSelector::Default);
        assert_eq!(CultureSelector::parse(Some("")), CultureSelector::Default);
        assert_eq!(CultureSelector::parse(Some("*")), CultureSelector::All);
        assert_eq!(
            CultureSelector::parse(Some("en")),
            CultureSelector::Named("en")
        );
    }

    #[test]
    fn test_cache_rebuilds_on_new_serial() {
        let cache = UpdateBufferCache::default();
        let mut builds = 0;
        let a = cache.get_or_build(UpdateKind::Full, 1, || {
            builds += 1;
            vec![1]
        });
        let b = cache.get_or_build(UpdateKind::Full, 1, || {
            builds += 1;
            vec![2]
        });
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.get_or_build(UpdateKind::Full, 2, || {
            builds += 1;
            vec![3]
        });
        assert_eq!(*c, vec![3]);
        assert_eq!(builds, 2);
    }
}
