// mcdex/src/cli/create_pack.rs
use clap::Args;
use colored::Colorize;
use mcdex_common::error::Result;
use mcdex_core::PackController;

#[derive(Args, Debug)]
pub struct CreatePack {
    /// Name of the pack; also used for its directory and launcher profile
    pub name: String,
    /// Minecraft version, e.g. 1.16.5
    pub minecraft_version: String,
    /// Forge version, e.g. 36.2.0
    pub forge_version: String,
}

impl CreatePack {
    pub fn run(&self, controller: &PackController) -> Result<()> {
        let mut pack =
            controller.create(&self.name, &self.minecraft_version, &self.forge_version)?;
        let profile = controller.create_launcher_profile(&mut pack)?;
        println!(
            "{} {} ({}) at {}",
            "Created pack".green().bold(),
            pack.name().cyan(),
            profile.version_id(),
            pack.root().display()
        );
        Ok(())
    }
}
