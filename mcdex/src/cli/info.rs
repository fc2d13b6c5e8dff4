// mcdex/src/cli/info.rs
use clap::Args;
use colored::Colorize;
use mcdex_common::error::Result;
use mcdex_common::Config;

#[derive(Args, Debug)]
pub struct Info;

impl Info {
    pub fn run(&self, config: &Config) -> Result<()> {
        let rows = [
            ("Version", env!("CARGO_PKG_VERSION").to_string()),
            ("Minecraft dir", config.minecraft_dir.display().to_string()),
            ("mcdex root", config.mcdex_root().display().to_string()),
            ("Packs", config.packs_dir().display().to_string()),
            ("Cache", config.cache_dir().display().to_string()),
            ("Repository", config.repository_url.clone()),
            ("Forge maven", config.forge_maven_url.clone()),
            ("Java", config.java_command.clone()),
            ("Workers", config.max_workers.to_string()),
        ];
        for (label, value) in rows {
            println!("{:>14}: {}", label.bold(), value);
        }
        Ok(())
    }
}
