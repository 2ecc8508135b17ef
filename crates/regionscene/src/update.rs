//! Update envelopes and their scheduling.
//!
//! Every part owns exactly one [`ObjectUpdateInfo`]. The envelope carries the
//! part's region-local id, a one-way kill flag and the serial number that
//! versions the part's state; viewer buffers are derived from the part on
//! demand and cached per localization against that serial.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::localization::UpdateKind;
use crate::part::ObjectPart;

/// Receives envelopes that have new state to send.
///
/// Scheduling is fire-and-forget: nothing flows back to the caller.
pub trait UpdateScheduler: Send + Sync {
    fn schedule_update(&self, info: &Arc<ObjectUpdateInfo>);
}

/// The externally visible update handle of a part.
#[derive(Debug)]
pub struct ObjectUpdateInfo {
    part: Weak<ObjectPart>,
    local_id: AtomicU32,
    serial: AtomicU32,
    /// Guards the kill flag and buffer derivation.
    killed: Mutex<bool>,
}

impl ObjectUpdateInfo {
    pub(crate) fn new(part: Weak<ObjectPart>) -> Self {
        Self {
            part,
            local_id: AtomicU32::new(0),
            serial: AtomicU32::new(0),
            killed: Mutex::new(false),
        }
    }

    /// The part, while it is still alive.
    #[must_use]
    pub fn part(&self) -> Option<Arc<ObjectPart>> {
        self.part.upgrade()
    }

    #[must_use]
    pub fn local_id(&self) -> u32 {
        self.local_id.load(Ordering::Acquire)
    }

    /// Assign the region-local id. Bumps the serial since every buffer
    /// embeds the id, and a root's children since they embed it as parent.
    pub fn set_local_id(&self, local_id: u32) {
        self.local_id.store(local_id, Ordering::Release);
        self.increment_serial();
        if let Some(part) = self.part.upgrade() {
            part.refresh_children();
        }
    }

    #[must_use]
    pub fn serial_number(&self) -> u32 {
        self.serial.load(Ordering::Acquire)
    }

    pub(crate) fn increment_serial(&self) -> u32 {
        self.serial.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    #[must_use]
    pub fn is_killed(&self) -> bool {
        *self.killed.lock()
    }

    /// Mark the envelope dead. Idempotent; a killed envelope never returns
    /// another buffer.
    pub fn kill_object(&self) {
        let mut killed = self.killed.lock();
        if !*killed {
            *killed = true;
            tracing::debug!(local_id = self.local_id(), "object update info killed");
        }
    }

    #[must_use]
    pub fn full_update(&self, culture: Option<&str>) -> Option<Arc<Vec<u8>>> {
        self.derive(UpdateKind::Full, culture)
    }

    #[must_use]
    pub fn terse_update(&self, culture: Option<&str>) -> Option<Arc<Vec<u8>>> {
        self.derive(UpdateKind::Terse, culture)
    }

    #[must_use]
    pub fn compressed_update(&self, culture: Option<&str>) -> Option<Arc<Vec<u8>>> {
        self.derive(UpdateKind::Compressed, culture)
    }

    #[must_use]
    pub fn properties_update(&self, culture: Option<&str>) -> Option<Arc<Vec<u8>>> {
        self.derive(UpdateKind::Properties, culture)
    }

    fn derive(&self, kind: UpdateKind, culture: Option<&str>) -> Option<Arc<Vec<u8>>> {
        let killed = self.killed.lock();
        if *killed {
            return None;
        }
        let part = self.part.upgrade()?;
        Some(part.cached_update(kind, culture, self.serial_number(), self.local_id()))
    }
}

/// One coalesced queue entry.
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub info: Arc<ObjectUpdateInfo>,
    /// Highest serial seen for the object since the last drain.
    pub serial: u32,
    pub kill: bool,
}

#[derive(Debug, Default)]
struct QueueInner {
    order: VecDeque<u32>,
    pending: HashMap<u32, PendingUpdate>,
}

/// A coalescing [`UpdateScheduler`] keyed by local id.
///
/// Repeated schedules of the same object collapse into one entry keeping
/// the first-scheduled position and the newest serial. A kill is terminal:
/// later schedules for that local id cannot revive the entry.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    inner: Mutex<QueueInner>,
}

impl UpdateQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().order.is_empty()
    }

    /// Take every pending entry in scheduling order.
    pub fn drain(&self) -> Vec<PendingUpdate> {
        let mut inner = self.inner.lock();
        let QueueInner { order, pending } = &mut *inner;
        order
            .drain(..)
            .filter_map(|local_id| pending.remove(&local_id))
            .collect()
    }
}

impl UpdateScheduler for UpdateQueue {
    fn schedule_update(&self, info: &Arc<ObjectUpdateInfo>) {
        let local_id = info.local_id();
        let serial = info.serial_number();
        let kill = info.is_killed();

        let mut inner = self.inner.lock();
        if let Some(entry) = inner.pending.get_mut(&local_id) {
            if entry.kill {
                return;
            }
            entry.serial = entry.serial.max(serial);
            entry.kill = kill;
            entry.info = Arc::clone(info);
            return;
        }
        inner.order.push_back(local_id);
        inner.pending.insert(
            local_id,
            PendingUpdate {
                info: Arc::clone(info),
                serial,
                kill,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(local_id: u32) -> Arc<ObjectUpdateInfo> {
        let part = ObjectPart::new(uuid::Uuid::new_v4());
        let info = Arc::clone(part.update_info());
        info.set_local_id(local_id);
        // Queueing never touches the part itself.
        drop(part);
        info
    }

    #[test]
    fn test_kill_is_terminal() {
        let part = ObjectPart::new(uuid::Uuid::new_v4());
        let info = Arc::clone(part.update_info());
        assert!(info.full_update(None).is_some());

        info.kill_object();
        info.kill_object();
        assert!(info.is_killed());
        assert!(info.full_update(None).is_none());
        assert!(info.terse_update(None).is_none());
        assert!(info.compressed_update(None).is_none());
        assert!(info.properties_update(Some("de")).is_none());
    }

    #[test]
    fn test_dropped_part_yields_nothing() {
        let part = ObjectPart::new(uuid::Uuid::new_v4());
        let info = Arc::clone(part.update_info());
        drop(part);
        assert!(info.part().is_none());
        assert!(info.full_update(None).is_none());
    }

    #[test]
    fn test_queue_coalesces_by_local_id() {
        let queue = UpdateQueue::new();
        let a = envelope(10);
        let b = envelope(11);

        queue.schedule_update(&a);
        queue.schedule_update(&b);
        a.increment_serial();
        queue.schedule_update(&a);
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        // First-scheduled order, newest serial.
        assert_eq!(drained[0].info.local_id(), 10);
        assert_eq!(drained[0].serial, a.serial_number());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_kill_is_terminal() {
        let queue = UpdateQueue::new();
        let a = envelope(5);
        a.kill_object();
        queue.schedule_update(&a);

        // A stale envelope reusing the local id cannot revive the entry.
        let stale = envelope(5);
        queue.schedule_update(&stale);

        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert!(drained[0].kill);
        assert!(Arc::ptr_eq(&drained[0].info, &a));
    }
}
