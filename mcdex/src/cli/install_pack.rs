// mcdex/src/cli/install_pack.rs
use clap::Args;
use mcdex_common::error::Result;
use mcdex_core::PackController;

use super::install_mods::print_report;

#[derive(Args, Debug)]
pub struct InstallPack {
    /// Local name for the pack
    pub name: String,
    /// URL of the pack archive (zip with manifest.json and overrides/)
    pub url: String,
}

impl InstallPack {
    pub async fn run(&self, controller: &PackController) -> Result<()> {
        let (pack, report) = controller.install_from_remote(&self.name, &self.url).await?;
        print_report(&pack, &report);
        Ok(())
    }
}
