// mcdex/src/cli/install_mods.rs
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use mcdex_common::error::Result;
use mcdex_core::{InstallReport, Pack, PackController};

#[derive(Args, Debug)]
pub struct InstallMods {
    /// Pack directory
    pub dir: PathBuf,
}

impl InstallMods {
    pub async fn run(&self, controller: &PackController) -> Result<()> {
        let mut pack = controller.open(&self.dir)?;
        let report = controller.install_mods(&mut pack).await?;
        print_report(&pack, &report);
        Ok(())
    }
}

pub fn print_report(pack: &Pack, report: &InstallReport) {
    println!(
        "{} {}: {} installed, {} up to date, {} removed",
        "==>".blue().bold(),
        pack.name().cyan().bold(),
        report.installed.len().to_string().green(),
        report.unchanged,
        report.removed.len()
    );
}
