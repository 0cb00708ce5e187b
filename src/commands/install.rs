use anyhow::{Result, bail};
use rockskit::{
    Backend, DesiredSpec, HandlerRegistry, LuaRocksBackend, PruneCache, SyncEngine, version,
};

use crate::Context;
use crate::cli::InstallArgs;
use crate::config::Manifest;
use crate::ui;

pub fn run(ctx: &Context, args: &InstallArgs) -> Result<()> {
    let mut manifest = Manifest::load(&ctx.manifest_path)?;

    let backend = LuaRocksBackend::with_program(&ctx.luarocks);
    if !backend.is_available() {
        bail!("luarocks is not available (tried {:?})", ctx.luarocks);
    }
    let registry = HandlerRegistry::new();
    let mut cache = PruneCache::new();
    let mut engine = SyncEngine::new(&backend, &registry, &mut cache);

    let spec = DesiredSpec::new(&args.name, args.version.clone(), args.opt);
    let rock = engine.install(&spec)?;
    ui::success(&format!("Installed {} {}", rock.name, rock.version));

    // Pin exactly what landed; dev builds keep the symbolic marker so
    // later syncs keep tracking the unreleased line.
    let pin = if version::is_dev(&rock.version) {
        version::DEV.to_string()
    } else {
        rock.version.clone()
    };
    manifest.set(&DesiredSpec::new(&rock.name, Some(pin), args.opt));
    manifest.save(&ctx.manifest_path)?;
    if !ctx.quiet {
        ui::dim(&format!("recorded in {}", ctx.manifest_path.display()));
    }

    Ok(())
}
