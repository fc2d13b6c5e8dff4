// mcdex/src/cli.rs
//! Command-line argument structure.
use clap::{ArgAction, Parser, Subcommand};
use mcdex_common::error::Result;
use mcdex_core::PackController;

pub mod create_pack;
pub mod info;
pub mod install_local_pack;
pub mod install_mods;
pub mod install_pack;
pub mod list_mods;
pub mod register_mod;
pub mod run_server;
pub mod status;

use crate::cli::create_pack::CreatePack;
use crate::cli::info::Info;
use crate::cli::install_local_pack::InstallLocalPack;
use crate::cli::install_mods::InstallMods;
use crate::cli::install_pack::InstallPack;
use crate::cli::list_mods::ListMods;
use crate::cli::register_mod::RegisterMod;
use crate::cli::run_server::RunServer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "mcdex", bin_name = "mcdex")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new, empty pack and a launcher profile for it
    CreatePack(CreatePack),
    /// Download a pack archive and install it under the given name
    InstallPack(InstallPack),
    /// Install the mods of a pack directory that already has a manifest
    InstallLocalPack(InstallLocalPack),
    /// Show version and paths in use
    Info(Info),
    /// Add a mod to a pack and install it
    RegisterMod(RegisterMod),
    /// Resolve and install every mod listed in a pack's manifest
    InstallMods(InstallMods),
    /// Set up a dedicated server for a pack
    RunServer(RunServer),
    /// Show the mods a pack lists
    ListMods(ListMods),
}

impl Command {
    /// Commands that only read local state and need no controller events.
    pub fn is_quiet(&self) -> bool {
        matches!(self, Self::Info(_) | Self::ListMods(_))
    }

    pub async fn run(&self, controller: &PackController) -> Result<()> {
        match self {
            Self::CreatePack(command) => command.run(controller),
            Self::InstallPack(command) => command.run(controller).await,
            Self::InstallLocalPack(command) => command.run(controller).await,
            Self::Info(command) => command.run(controller.config()),
            Self::RegisterMod(command) => command.run(controller).await,
            Self::InstallMods(command) => command.run(controller).await,
            Self::RunServer(command) => command.run(controller).await,
            Self::ListMods(command) => command.run(controller),
        }
    }
}
