// mcdex/src/cli/install_local_pack.rs
use std::path::PathBuf;

use clap::Args;
use mcdex_common::error::Result;
use mcdex_core::PackController;

use super::install_mods::print_report;

#[derive(Args, Debug)]
pub struct InstallLocalPack {
    /// Pack directory containing manifest.json (`.` for the current one)
    pub dir: PathBuf,
}

impl InstallLocalPack {
    pub async fn run(&self, controller: &PackController) -> Result<()> {
        let (pack, report) = controller.install_local(&self.dir).await?;
        print_report(&pack, &report);
        Ok(())
    }
}
