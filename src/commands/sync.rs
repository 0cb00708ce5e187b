use anyhow::{Result, bail};
use rockskit::{
    Backend, HandlerRegistry, LuaRocksBackend, Plan, PruneCache, SyncEngine, UpdateKind, plan,
};

use crate::Context;
use crate::cli::SyncArgs;
use crate::config::Manifest;
use crate::progress::ConsoleReporter;
use crate::ui;

pub fn run(ctx: &Context, args: &SyncArgs) -> Result<()> {
    ui::header("Syncing rocks");
    if ctx.verbose > 0 {
        ui::dim(&format!("manifest: {}", ctx.manifest_path.display()));
    }

    let manifest = Manifest::load(&ctx.manifest_path)?;
    let desired = manifest.desired();

    let backend = LuaRocksBackend::with_program(&ctx.luarocks);
    if !backend.is_available() {
        bail!("luarocks is not available (tried {:?})", ctx.luarocks);
    }
    let registry = HandlerRegistry::new();

    // Preview the plan so removals can be confirmed before anything
    // runs; the engine re-plans against fresh state itself.
    let installed = backend.installed()?;
    let preview = plan(&desired, &installed, &registry);

    if preview.is_empty() && preview.errors.is_empty() {
        ui::success("Rocks are in sync");
        return Ok(());
    }

    display_plan(&preview);

    if !preview.prune_candidates.is_empty() && !args.yes && !confirm_proceed()? {
        ui::warn("Aborted");
        return Ok(());
    }

    let mut cache = PruneCache::new();
    let mut engine = SyncEngine::new(&backend, &registry, &mut cache);
    let mut reporter = ConsoleReporter::new(ctx.quiet);
    let outcome = engine.sync(&desired, &mut reporter);

    println!();
    if outcome.is_clean() {
        ui::success("Rocks synced");
    } else {
        ui::warn("Rocks synced with errors");
    }
    if outcome.installed > 0 {
        ui::dim(&format!("{} rocks installed", outcome.installed));
    }
    if outcome.updated > 0 {
        ui::dim(&format!("{} rocks updated", outcome.updated));
    }
    if outcome.pruned > 0 {
        ui::dim(&format!("{} rocks removed", outcome.pruned));
    }

    if !outcome.is_clean() {
        bail!("sync completed with {} error(s)", outcome.errors.len());
    }
    Ok(())
}

fn display_plan(preview: &Plan) {
    for action in &preview.handler_actions {
        ui::change("~", &action.name, "(externally managed)");
    }
    for action in &preview.installs {
        let detail = match &action.version {
            Some(version) => format!("(not installed) → {version}"),
            None => "(not installed) → latest".to_string(),
        };
        ui::change("+", &action.name, &detail);
    }
    for action in &preview.updates {
        let verb = match action.kind {
            UpdateKind::Upgrade => "upgrade",
            UpdateKind::Downgrade => "downgrade",
        };
        ui::change(
            "~",
            &action.name,
            &format!("{} {} → {}", verb, action.from, action.to),
        );
    }
    for name in &preview.prune_candidates {
        ui::change("-", name, "(will remove if unreferenced)");
    }
    for error in &preview.errors {
        ui::error(error);
    }
    println!();
}

fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}
