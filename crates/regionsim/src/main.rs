//! Command-line tools for a region simulator: decode shape records, inspect
//! object XML and run terraform brushes against a configured region.

mod launch_params;

use std::process::ExitCode;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use primshape::PrimitiveShape;
use regionscene::scene::{LandArea, LandModification};
use regionscene::terrain::{Brush, FloodArea, PaintArea};
use regionscene::{ObjectGroup, RegionConfig, Scene};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use launch_params::{Command, LaunchParams};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let params = launch_params::parse();
    match run(params) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(params: LaunchParams) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &params.config {
        Some(path) => RegionConfig::from_json_file(path)?,
        None => RegionConfig::default(),
    };

    match params.command {
        Command::Shape { record } => describe_shape(&record),
        Command::Inspect { path, culture } => {
            let xml = std::fs::read_to_string(&path)?;
            let group = ObjectGroup::from_xml(&xml)?;
            describe_group(&group, culture.as_deref());
            Ok(())
        }
        Command::Terraform {
            effect,
            agent,
            at,
            radius,
            flood,
            strength,
            duration,
        } => {
            let scene = Scene::from_config(&config)?;
            let area = match flood {
                Some([west, south, east, north]) => LandArea::Flood(FloodArea {
                    west,
                    south,
                    east,
                    north,
                }),
                None => LandArea::Paint(PaintArea {
                    x: at.0,
                    y: at.1,
                    radius,
                }),
            };
            let before = scene.terrain().snapshot();
            let changed = scene.modify_land(&LandModification {
                agent,
                effect,
                area,
                brush: Brush { strength, duration },
            });
            let after = scene.terrain().snapshot();
            let (low, high) = after
                .iter()
                .zip(&before)
                .filter(|(new, old)| new != old)
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(low, high), (new, _)| {
                    (low.min(*new), high.max(*new))
                });
            println!("effect:        {}", effect.name());
            println!("cells changed: {changed}");
            if changed > 0 {
                println!("height range:  {low:.3}..{high:.3}");
            }
            Ok(())
        }
        Command::DefaultConfig => {
            println!("{}", config.to_json_string()?);
            Ok(())
        }
    }
}

fn describe_shape(record: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = STANDARD.decode(record.trim())?;
    let shape = PrimitiveShape::from_bytes(&bytes)?;
    let params = shape.decoded_params();
    println!("type:       {:?}", shape.shape_type());
    println!("sides:      {}", shape.number_of_sides());
    println!("sane:       {}", shape.is_sane());
    println!("profile:    {:?} / {:?}", params.profile_shape, params.hole_shape);
    println!("path:       {:?}", params.path_curve);
    println!(
        "profile cut {:.3}..{:.3} hollow {:.3}",
        params.profile_begin, params.profile_end, params.profile_hollow
    );
    println!("path cut    {:.3}..{:.3}", params.path_begin, params.path_end);
    println!(
        "scale {} shear {} taper {}",
        params.path_scale, params.top_shear, params.taper
    );
    println!(
        "twist {:.3}..{:.3} radius offset {:.3} revolutions {:.3} skew {:.3}",
        params.twist_begin, params.twist_end, params.radius_offset, params.revolutions, params.skew
    );
    Ok(())
}

fn describe_group(group: &ObjectGroup, culture: Option<&str>) {
    let owner = group.owner();
    println!("object {} owned by {}", group.id(), owner.id);
    for part in group.parts() {
        let position = part.global_position();
        let cultures: Vec<String> = part
            .localizations()
            .cultures()
            .map(str::to_owned)
            .collect();
        println!(
            "  {} {:?} \"{}\" at {position} ({:?})",
            part.id(),
            part.shape_type(),
            part.name(culture),
            part.description(culture),
        );
        if !cultures.is_empty() {
            println!("    cultures: {}", cultures.join(", "));
        }
    }
}
