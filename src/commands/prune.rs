use anyhow::{Result, bail};
use dialoguer::Confirm;
use rockskit::{Backend, HandlerRegistry, LuaRocksBackend, PruneCache, SyncEngine};
use std::collections::BTreeSet;

use crate::Context;
use crate::cli::PruneArgs;
use crate::config::Manifest;
use crate::ui;

pub fn run(ctx: &Context, args: &PruneArgs) -> Result<()> {
    let name = args.name.to_lowercase();
    let mut manifest = Manifest::load(&ctx.manifest_path)?;

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove {name} together with its now-unused dependencies?"
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            ui::warn("Aborted");
            return Ok(());
        }
    }

    let backend = LuaRocksBackend::with_program(&ctx.luarocks);
    if !backend.is_available() {
        bail!("luarocks is not available (tried {:?})", ctx.luarocks);
    }
    let registry = HandlerRegistry::new();
    let mut cache = PruneCache::new();
    let mut engine = SyncEngine::new(&backend, &registry, &mut cache);

    // Drop the manifest entry first so the keep set reflects what the
    // user still wants, then save regardless of how the removal goes.
    manifest.remove(&name);
    let keep: BTreeSet<String> = manifest.desired().into_keys().collect();
    let complete = engine.remove_recursive(&name, &keep);
    manifest.save(&ctx.manifest_path)?;

    if !complete {
        bail!("prune of {name} was incomplete; re-run to retry the leftovers");
    }
    ui::success(&format!("Pruned {name}"));
    Ok(())
}
