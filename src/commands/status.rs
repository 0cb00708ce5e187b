use anyhow::{Result, bail};
use rockskit::{Backend, HandlerRegistry, LuaRocksBackend, UpdateKind, plan};
use serde::Serialize;

use crate::Context;
use crate::cli::StatusArgs;
use crate::config::Manifest;
use crate::ui;

#[derive(Serialize)]
struct Report {
    in_sync: bool,
    declared: usize,
    installed: usize,
    missing: Vec<MissingEntry>,
    changes: Vec<ChangeEntry>,
    prunable: Vec<String>,
    outdated: Vec<OutdatedEntry>,
    errors: Vec<String>,
}

#[derive(Serialize)]
struct MissingEntry {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

#[derive(Serialize)]
struct ChangeEntry {
    name: String,
    from: String,
    to: String,
    kind: &'static str,
}

#[derive(Serialize)]
struct OutdatedEntry {
    name: String,
    installed: String,
    available: String,
}

pub fn run(ctx: &Context, args: &StatusArgs) -> Result<()> {
    let manifest = Manifest::load(&ctx.manifest_path)?;
    let desired = manifest.desired();

    let backend = LuaRocksBackend::with_program(&ctx.luarocks);
    if !backend.is_available() {
        bail!("luarocks is not available (tried {:?})", ctx.luarocks);
    }
    let registry = HandlerRegistry::new();

    let installed = backend.installed()?;
    let diff = plan(&desired, &installed, &registry);

    // Outdated rocks are informational: only ones we declare and leave
    // unpinned would actually move on `rocksync update`.
    let outdated: Vec<OutdatedEntry> = backend
        .outdated()?
        .into_values()
        .filter(|rock| desired.contains_key(&rock.name))
        .map(|rock| OutdatedEntry {
            name: rock.name,
            installed: rock.installed,
            available: rock.available,
        })
        .collect();

    let report = Report {
        in_sync: diff.is_empty() && diff.errors.is_empty(),
        declared: desired.len(),
        installed: installed.len(),
        missing: diff
            .installs
            .iter()
            .map(|action| MissingEntry {
                name: action.name.clone(),
                version: action.version.clone(),
            })
            .collect(),
        changes: diff
            .updates
            .iter()
            .map(|action| ChangeEntry {
                name: action.name.clone(),
                from: action.from.clone(),
                to: action.to.clone(),
                kind: match action.kind {
                    UpdateKind::Upgrade => "upgrade",
                    UpdateKind::Downgrade => "downgrade",
                },
            })
            .collect(),
        prunable: diff.prune_candidates.clone(),
        outdated,
        errors: diff.errors.clone(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    ui::header("Rock status");
    ui::kv("manifest", &ctx.manifest_path.display().to_string());
    ui::kv("declared", &report.declared.to_string());
    ui::kv("installed", &report.installed.to_string());
    println!();

    for entry in &report.missing {
        let detail = match &entry.version {
            Some(version) => format!("missing, wants {version}"),
            None => "missing".to_string(),
        };
        ui::change("+", &entry.name, &detail);
    }
    for entry in &report.changes {
        ui::change(
            "~",
            &entry.name,
            &format!("{} {} → {}", entry.kind, entry.from, entry.to),
        );
    }
    for name in &report.prunable {
        ui::change("-", name, "not in manifest");
    }
    for entry in &report.outdated {
        ui::info(&format!(
            "{} {} has {} available",
            entry.name, entry.installed, entry.available
        ));
    }
    for error in &report.errors {
        ui::error(error);
    }

    if report.in_sync {
        ui::success("Rocks are in sync");
    } else {
        ui::warn("Run `rocksync sync` to converge");
    }
    Ok(())
}
