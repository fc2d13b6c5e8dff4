// mcdex/src/cli/register_mod.rs
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use mcdex_common::error::Result;
use mcdex_common::model::ModSpec;
use mcdex_core::PackController;

#[derive(Args, Debug)]
pub struct RegisterMod {
    /// Pack directory
    pub dir: PathBuf,
    /// Download URL, CurseForge file URL, project id[:file id] or slug[@version]
    pub reference: String,
    /// Display name for URL references
    pub name: Option<String>,
}

impl RegisterMod {
    pub async fn run(&self, controller: &PackController) -> Result<()> {
        let spec = ModSpec::parse(&self.reference, self.name.as_deref())?;
        let mut pack = controller.open(&self.dir)?;
        let report = controller.register_mod(&mut pack, &spec).await?;
        println!(
            "{} {} in {} ({} files installed)",
            "Registered".green().bold(),
            spec.to_string().cyan(),
            pack.name(),
            report.installed.len()
        );
        Ok(())
    }
}
