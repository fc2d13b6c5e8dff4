// mcdex/src/cli/run_server.rs
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use mcdex_common::error::Result;
use mcdex_core::PackController;

#[derive(Args, Debug)]
pub struct RunServer {
    /// Pack directory
    pub dir: PathBuf,
}

impl RunServer {
    pub async fn run(&self, controller: &PackController) -> Result<()> {
        let mut pack = controller.open(&self.dir)?;
        let report = controller.provision_server(&mut pack).await?;
        println!(
            "{} {} with {} mods",
            "Server ready in".green().bold(),
            report.server_dir.display(),
            report.mods_copied
        );
        Ok(())
    }
}
