//! Real LuaRocks CLI backend using `luarocks` commands.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::invoker::{Invoker, ProcessOutput};
use crate::types::{OutdatedRock, Rock};
use crate::version;
use std::collections::BTreeMap;

/// Backend that executes real `luarocks` commands.
pub struct LuaRocksBackend {
    invoker: Invoker,
    /// Extra arguments prepended to every call, e.g. `--tree <path>`.
    base_args: Vec<String>,
}

impl LuaRocksBackend {
    /// Create a backend running the `luarocks` binary from PATH.
    pub fn new() -> Self {
        Self::with_program("luarocks")
    }

    /// Create a backend running a specific binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            invoker: Invoker::new(program),
            base_args: Vec::new(),
        }
    }

    /// Target a specific rocks tree instead of the default one.
    pub fn with_tree(mut self, tree: impl Into<String>) -> Self {
        self.base_args.push("--tree".to_string());
        self.base_args.push(tree.into());
        self
    }

    /// Run a luarocks command, blocking until it exits.
    fn run(&self, args: &[&str]) -> ProcessOutput {
        let mut full: Vec<&str> = self.base_args.iter().map(String::as_str).collect();
        full.extend_from_slice(args);
        self.invoker.run(&full).wait()
    }

    /// Run a luarocks command and fail on non-zero exit.
    fn run_checked(&self, args: &[&str], action: &'static str, name: &str) -> Result<String> {
        let output = self.run(args);

        if output.spawn_failed {
            return Err(Error::Spawn {
                program: self.invoker.program().to_string(),
                message: output.stderr,
            });
        }
        if !output.success() {
            return Err(Error::tool(action, name, &output.stderr));
        }

        Ok(output.stdout)
    }
}

impl Default for LuaRocksBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for LuaRocksBackend {
    fn is_available(&self) -> bool {
        self.run(&["--version"]).success()
    }

    fn installed(&self) -> Result<BTreeMap<String, Rock>> {
        let stdout = self.run_checked(&["list", "--porcelain"], "list", "installed rocks")?;
        Ok(parse_list(&stdout))
    }

    fn dependencies(&self, name: &str) -> Result<BTreeMap<String, Rock>> {
        let stdout = self.run_checked(&["show", "--porcelain", name], "show", name)?;
        Ok(parse_dependencies(&stdout))
    }

    fn outdated(&self) -> Result<BTreeMap<String, OutdatedRock>> {
        let stdout = self.run_checked(
            &["list", "--porcelain", "--outdated"],
            "list",
            "outdated rocks",
        )?;
        Ok(parse_outdated(&stdout))
    }

    fn install(&self, name: &str, version: Option<&str>) -> Result<Rock> {
        let mut args = vec!["install", name];
        match version {
            Some(v) if version::is_dev(v) => args.push("--dev"),
            Some(v) => args.push(v),
            None => {}
        }

        let stdout = self.run_checked(&args, "install", name)?;

        match parse_installed_version(&stdout, name) {
            Some(installed) => Ok(Rock::new(name, installed)),
            None => Err(Error::Output {
                name: name.to_string(),
                message: "install succeeded but no installed version was reported".to_string(),
            }),
        }
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.run_checked(&["remove", name], "remove", name)?;
        Ok(())
    }
}

/// Parse `luarocks list --porcelain` output.
///
/// Lines are tab-separated: `name<TAB>version<TAB>status<TAB>tree`.
fn parse_list(stdout: &str) -> BTreeMap<String, Rock> {
    let mut rocks = BTreeMap::new();
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() >= 2 && !fields[0].trim().is_empty() {
            let rock = Rock::new(fields[0].trim(), fields[1].trim());
            rocks.insert(rock.name.clone(), rock);
        }
    }
    rocks
}

/// Parse `luarocks list --porcelain --outdated` output.
///
/// Lines are tab-separated: `name<TAB>installed<TAB>available<TAB>repo`.
fn parse_outdated(stdout: &str) -> BTreeMap<String, OutdatedRock> {
    let mut outdated = BTreeMap::new();
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() >= 3 && !fields[0].trim().is_empty() {
            let name = fields[0].trim().to_lowercase();
            outdated.insert(
                name.clone(),
                OutdatedRock {
                    name,
                    installed: fields[1].trim().to_string(),
                    available: fields[2].trim().to_string(),
                },
            );
        }
    }
    outdated
}

/// Parse dependency fields out of `luarocks show --porcelain` output.
///
/// Dependency lines look like `dependency<TAB>luafilesystem >= 1.8.0`;
/// only the dependency name matters for pruning decisions.
fn parse_dependencies(stdout: &str) -> BTreeMap<String, Rock> {
    let mut deps = BTreeMap::new();
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() >= 2 && fields[0].trim() == "dependency" {
            let mut tokens = fields[1].split_whitespace();
            if let Some(name) = tokens.next() {
                // Lua itself is a platform requirement, not a rock.
                if name.eq_ignore_ascii_case("lua") {
                    continue;
                }
                let constraint: String = tokens.collect::<Vec<_>>().join(" ");
                let rock = Rock::new(name, constraint);
                deps.insert(rock.name.clone(), rock);
            }
        }
    }
    deps
}

/// Recover the concretely installed version from install stdout.
///
/// The tool prints `<name> <version>` on success; the version token is
/// reported without any trailing `-<revision>` suffix.
fn parse_installed_version(stdout: &str, name: &str) -> Option<String> {
    for line in stdout.lines() {
        let mut tokens = line.split_whitespace();
        if let (Some(first), Some(second)) = (tokens.next(), tokens.next())
            && first.eq_ignore_ascii_case(name)
        {
            return Some(version::strip_revision(second).to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let stdout = "luafilesystem\t1.8.0-1\tinstalled\t/usr/local\n\
                      Penlight\t1.13.1-1\tinstalled\t/usr/local\n";
        let rocks = parse_list(stdout);
        assert_eq!(rocks.len(), 2);
        assert_eq!(rocks["luafilesystem"].version, "1.8.0-1");
        // Names are normalized at the boundary
        assert_eq!(rocks["penlight"].name, "penlight");
    }

    #[test]
    fn test_parse_list_skips_malformed_lines() {
        let rocks = parse_list("\nnot-tab-separated\n");
        assert!(rocks.is_empty());
    }

    #[test]
    fn test_parse_outdated() {
        let stdout = "lua-cjson\t2.1.0-1\t2.1.0.10-1\tmain\n";
        let outdated = parse_outdated(stdout);
        assert_eq!(outdated["lua-cjson"].installed, "2.1.0-1");
        assert_eq!(outdated["lua-cjson"].available, "2.1.0.10-1");
    }

    #[test]
    fn test_parse_dependencies() {
        let stdout = "rock\tneotest\n\
                      version\t5.2.3-1\n\
                      dependency\tlua >= 5.1\n\
                      dependency\tnvim-nio >= 1.2.0\n\
                      dependency\tplenary.nvim\n";
        let deps = parse_dependencies(stdout);
        assert_eq!(deps.len(), 2);
        assert!(deps.contains_key("nvim-nio"));
        assert!(deps.contains_key("plenary.nvim"));
        // The lua platform requirement is not a prunable rock
        assert!(!deps.contains_key("lua"));
    }

    #[test]
    fn test_parse_installed_version() {
        let stdout = "Installing https://luarocks.org/lua-cjson-2.1.0-1.src.rock\n\
                      lua-cjson 2.1.0-1 is now installed in /usr/local\n";
        assert_eq!(
            parse_installed_version(stdout, "lua-cjson"),
            Some("2.1.0".to_string())
        );
    }

    #[test]
    fn test_parse_installed_version_dev() {
        let stdout = "telescope scm-1 is now installed\n";
        assert_eq!(
            parse_installed_version(stdout, "telescope"),
            Some("scm-1".to_string())
        );
    }

    #[test]
    fn test_parse_installed_version_missing() {
        assert_eq!(parse_installed_version("nothing relevant", "cjson"), None);
    }
}
