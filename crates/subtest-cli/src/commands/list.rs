//! List command - show the top-level tests a selector would run

use super::{parse_selector, resolve_packages};
use crate::packages::Package;
use anyhow::Result;
use colored::*;
use std::io::{self, Write};
use subtest_runtime::Selector;

pub struct ListArgs {
    pub packages: Vec<String>,
    pub filter: Option<String>,
    pub no_color: bool,
}

pub fn run(args: ListArgs, config: &subtest_config::Config) -> Result<()> {
    if args.no_color {
        colored::control::set_override(false);
    }

    let packages = resolve_packages(&args.packages, config.default_packages())?;
    let selector = parse_selector(args.filter.as_deref().or(config.filter()))?;

    let stdout = io::stdout();
    write_list(&mut stdout.lock(), &packages, &selector)?;

    if args.no_color {
        colored::control::unset_override();
    }
    Ok(())
}

/// Top-level names only: deeper units exist only once a body runs
pub fn write_list(
    out: &mut impl Write,
    packages: &[&'static dyn Package],
    selector: &Selector,
) -> io::Result<()> {
    for package in packages {
        writeln!(out, "{}  {}", package.name().bold(), package.about().dimmed())?;
        for name in package.test_names() {
            if selector.matches_at(0, name) {
                writeln!(out, "    {}", name)?;
            }
        }
    }
    Ok(())
}
