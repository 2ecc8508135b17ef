//! Cross-module behaviour of parts, groups, the permission engine and
//! terraforming.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{Quat, Vec3};
use primshape::{
    HoleShape, PathCurve, PrimitiveShape, PrimitiveShapeType, ProfileShape, SculptType,
};
use regionscene::config::ParcelConfig;
use regionscene::parcel::ParcelFlags;
use regionscene::scene::{LandArea, LandModification};
use regionscene::terrain::{Brush, PaintArea, TerrainEffect};
use regionscene::{
    ChangedFlags, ObjectGroup, ObjectPart, RegionConfig, Scene, Ugui, UpdateQueue,
    UpdateScheduler, XmlOwnerMode,
};
use uuid::Uuid;

const OWNER: Uuid = Uuid::from_u128(0x10);
const NEIGHBOUR: Uuid = Uuid::from_u128(0x20);

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn two_plot_scene() -> Scene {
    init_logging();
    let closed = Some(ParcelFlags::ALLOW_FLY.bits());
    let config = RegionConfig {
        parcels: vec![
            ParcelConfig {
                name: "West".to_owned(),
                east: 64.0,
                north: 256.0,
                owner: Ugui::from(OWNER),
                flags: closed,
                ..ParcelConfig::default()
            },
            ParcelConfig {
                name: "East".to_owned(),
                west: 64.0,
                east: 256.0,
                north: 256.0,
                owner: Ugui::from(NEIGHBOUR),
                flags: closed,
                ..ParcelConfig::default()
            },
        ],
        ..RegionConfig::default()
    };
    Scene::from_config(&config).unwrap()
}

#[test]
fn test_detached_part_mutations_do_not_schedule() {
    let part = ObjectPart::new(Uuid::new_v4());
    let notified = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&notified);
    part.on_update().add(Arc::new(move |_: &ObjectPart, _: ChangedFlags| {
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    part.set_position(Vec3::new(1.0, 2.0, 3.0));
    part.set_size(Vec3::splat(2.0));
    part.set_name(None, "Loose");
    part.set_locked(true);
    assert_eq!(part.global_position(), Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(notified.load(Ordering::SeqCst), 0);
    assert!(part.update_info().serial_number() >= 4);
}

#[test]
fn test_child_position_is_relative_to_root() {
    let root = ObjectPart::new(Uuid::new_v4());
    root.set_global_position(Vec3::new(100.0, 50.0, 20.0));
    let group = ObjectGroup::new(Arc::clone(&root));

    let child = ObjectPart::new(Uuid::new_v4());
    group.link(Arc::clone(&child));
    child.set_position(Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(child.position(), Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(child.local_position(), child.position());

    child.set_position(Vec3::new(2.0, 0.0, 0.0));
    assert_eq!(child.global_position(), Vec3::new(102.0, 50.0, 20.0));

    // Under a rotated root the offset turns with it.
    root.set_global_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
    child.set_position(Vec3::new(2.0, 0.0, 0.0));
    assert!(child.global_position().abs_diff_eq(Vec3::new(100.0, 52.0, 20.0), 1e-4));
    assert!(child.position().abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-4));
}

#[test]
fn test_locked_objects_refuse_their_owner() {
    let scene = two_plot_scene();
    let group = ObjectGroup::new(ObjectPart::new(Uuid::new_v4()));
    group.set_owner(Ugui::from(OWNER));
    group.set_global_position(Vec3::new(10.0, 10.0, 25.0));
    assert!(scene.can_move(OWNER, &group));

    group.root_part().set_locked(true);
    assert!(!scene.can_move(OWNER, &group));
    assert!(!scene.can_edit(OWNER, &group));
    assert!(!scene.can_delete(OWNER, &group));
}

#[test]
fn test_blacklisted_assets_never_rez() {
    let scene = two_plot_scene();
    let asset = Uuid::from_u128(0xbad);
    if let Some(parcel) = scene.parcels_mut().parcel_mut(2) {
        parcel.flags.insert(ParcelFlags::CREATE_OBJECTS);
    }
    assert!(scene.can_rez(NEIGHBOUR, asset, Vec3::new(10.0, 10.0, 25.0)));
    scene.blacklist_rez_asset(asset);
    assert!(!scene.can_rez(OWNER, asset, Vec3::new(10.0, 10.0, 25.0)));
    assert!(!scene.can_rez(NEIGHBOUR, asset, Vec3::new(10.0, 10.0, 25.0)));
}

#[test]
fn test_raise_across_parcel_boundary_only_touches_permitted_cells() {
    let scene = two_plot_scene();
    let before = scene.terrain().snapshot();
    let size_x = scene.terrain().size_x();

    scene.modify_land(&LandModification {
        agent: OWNER,
        effect: TerrainEffect::Raise,
        area: LandArea::Paint(PaintArea {
            x: 64.0,
            y: 100.0,
            radius: 8.0,
        }),
        brush: Brush {
            strength: 2.0,
            duration: 0.5,
        },
    });

    let after = scene.terrain().snapshot();
    let mut raised = 0;
    for (index, (old, new)) in before.iter().zip(&after).enumerate() {
        let x = index % size_x;
        if x >= 64 {
            assert_eq!(old, new, "cell ({x}, {}) on the neighbour's plot changed", index / size_x);
        } else if new != old {
            raised += 1;
        }
    }
    assert!(raised > 0);
}

#[test]
fn test_kill_is_one_way() {
    let part = ObjectPart::new(Uuid::new_v4());
    let group = ObjectGroup::new(Arc::clone(&part));
    let queue = Arc::new(UpdateQueue::new());
    let scheduler: Arc<dyn UpdateScheduler> = queue.clone();
    group.set_scheduler(Some(scheduler));
    let info = Arc::clone(part.update_info());
    assert!(info.properties_update(None).is_some());

    info.kill_object();
    info.kill_object();
    part.set_name(None, "After death");
    assert!(info.full_update(None).is_none());
    assert!(info.terse_update(None).is_none());
    assert!(info.properties_update(None).is_none());
}

#[test]
fn test_cylinder_becomes_sculpt() {
    let mut shape = PrimitiveShape::default();
    shape.set_profile(ProfileShape::Circle, HoleShape::Same);
    shape.path_curve = PathCurve::Straight as u8;
    let part = ObjectPart::with_shape(Uuid::new_v4(), shape);
    assert_eq!(part.shape_type(), PrimitiveShapeType::Cylinder);

    part.update_shape(ChangedFlags::SHAPE, |shape| {
        shape.set_sculpt_kind(SculptType::Mesh);
        shape.sculpt_map = Uuid::from_u128(0x5c);
    });
    assert_eq!(part.shape_type(), PrimitiveShapeType::Sculpt);
}

#[test]
fn test_group_xml_survives_a_round_trip() {
    let root = ObjectPart::new(Uuid::new_v4());
    root.set_name(None, "Table");
    root.set_global_position(Vec3::new(30.0, 40.0, 22.0));
    let group = ObjectGroup::new(Arc::clone(&root));
    group.set_owner(Ugui::from(OWNER));
    let leg = ObjectPart::new(Uuid::new_v4());
    group.link(Arc::clone(&leg));
    leg.set_position(Vec3::new(0.5, 0.5, -0.5));

    let xml = group.to_xml(XmlOwnerMode::Full).unwrap();
    let copy = ObjectGroup::from_xml(&xml).unwrap();
    assert_eq!(copy.id(), group.id());
    assert_eq!(copy.part_count(), 2);
    assert_eq!(copy.owner().id, OWNER);
    assert_eq!(copy.root_part().name(None), "Table");
    let copied_leg = copy.find_part(leg.id()).unwrap();
    assert!(copied_leg.position().abs_diff_eq(Vec3::new(0.5, 0.5, -0.5), 1e-5));
}
