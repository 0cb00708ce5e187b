use anyhow::{Result, bail};
use rockskit::{Backend, HandlerRegistry, LuaRocksBackend, PruneCache, SyncEngine};

use crate::Context;
use crate::cli::RemoveArgs;
use crate::config::Manifest;
use crate::ui;

pub fn run(ctx: &Context, args: &RemoveArgs) -> Result<()> {
    let mut manifest = Manifest::load(&ctx.manifest_path)?;

    let backend = LuaRocksBackend::with_program(&ctx.luarocks);
    if !backend.is_available() {
        bail!("luarocks is not available (tried {:?})", ctx.luarocks);
    }
    let registry = HandlerRegistry::new();
    let mut cache = PruneCache::new();
    let mut engine = SyncEngine::new(&backend, &registry, &mut cache);

    engine.remove(&args.name)?;
    ui::success(&format!("Removed {}", args.name.to_lowercase()));

    if manifest.remove(&args.name) {
        manifest.save(&ctx.manifest_path)?;
        if !ctx.quiet {
            ui::dim("dropped from the manifest");
        }
    }

    Ok(())
}
