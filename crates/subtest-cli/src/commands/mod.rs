pub mod list;
pub mod run;

use crate::packages::{self, Package};
use anyhow::{anyhow, Context, Result};
use subtest_runtime::Selector;

/// Packages named on the command line, else the configured defaults, else all
pub fn resolve_packages(
    requested: &[String],
    defaults: &[String],
) -> Result<Vec<&'static dyn Package>> {
    let names = if requested.is_empty() {
        defaults
    } else {
        requested
    };
    if names.is_empty() {
        return Ok(packages::all());
    }

    names
        .iter()
        .map(|name| {
            packages::find(name).ok_or_else(|| {
                let available: Vec<_> = packages::all().iter().map(|p| p.name()).collect();
                anyhow!(
                    "unknown package '{}' (available: {})",
                    name,
                    available.join(", ")
                )
            })
        })
        .collect()
}

/// Parse the `--run` expression; absent means every unit
pub fn parse_selector(expression: Option<&str>) -> Result<Selector> {
    let expression = expression.unwrap_or_default();
    Selector::parse(expression)
        .with_context(|| format!("invalid --run expression '{}'", expression))
}
