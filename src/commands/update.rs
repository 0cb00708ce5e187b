use anyhow::{Result, bail};
use rockskit::{
    Backend, DesiredSpec, HandlerRegistry, LuaRocksBackend, PruneCache, SyncEngine, version,
};

use crate::Context;
use crate::cli::UpdateArgs;
use crate::config::Manifest;
use crate::ui;

pub fn run(ctx: &Context, args: &UpdateArgs) -> Result<()> {
    ui::header("Updating rocks");

    let mut manifest = Manifest::load(&ctx.manifest_path)?;
    let desired = manifest.desired();

    let backend = LuaRocksBackend::with_program(&ctx.luarocks);
    if !backend.is_available() {
        bail!("luarocks is not available (tried {:?})", ctx.luarocks);
    }
    let registry = HandlerRegistry::new();
    let mut cache = PruneCache::new();
    let mut engine = SyncEngine::new(&backend, &registry, &mut cache);

    let filter = args.name.as_ref().map(|name| name.to_lowercase());

    // Only rocks the manifest declares are ours to touch.
    let targets: Vec<_> = backend
        .outdated()?
        .into_values()
        .filter(|rock| desired.contains_key(&rock.name))
        .filter(|rock| filter.as_deref().is_none_or(|name| name == rock.name))
        .collect();

    if targets.is_empty() {
        match &filter {
            Some(name) if !desired.contains_key(name) => {
                bail!("{name} is not in the manifest");
            }
            _ => ui::success("Everything is up to date"),
        }
        return Ok(());
    }

    let mut failed = 0usize;
    for outdated in &targets {
        let spec = &desired[&outdated.name];
        let target = version::strip_revision(&outdated.available).to_string();
        match engine.install(&DesiredSpec::new(
            &outdated.name,
            Some(target.clone()),
            spec.opt,
        )) {
            Ok(rock) => {
                ui::change(
                    "~",
                    &rock.name,
                    &format!("{} → {}", outdated.installed, rock.version),
                );
                // Pinned entries follow the new version; tracking
                // entries stay unpinned.
                if spec.version.is_some() {
                    manifest.set(&DesiredSpec::new(&rock.name, Some(target), spec.opt));
                }
            }
            Err(error) => {
                ui::error(&format!("{}: {error}", outdated.name));
                failed += 1;
            }
        }
    }

    manifest.save(&ctx.manifest_path)?;

    println!();
    if failed > 0 {
        bail!("{failed} of {} update(s) failed", targets.len());
    }
    ui::success(&format!("{} rocks updated", targets.len()));
    Ok(())
}
