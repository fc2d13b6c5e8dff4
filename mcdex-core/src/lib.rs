// mcdex-core/src/lib.rs
pub mod install;
pub mod launcher;
pub mod pack;
pub mod pipeline;
pub mod resolve;
pub mod server;

pub use install::{InstallReport, Installer};
pub use launcher::{LauncherProfile, LauncherProfileSink, LauncherProfilesFile};
pub use pack::{Pack, PackController};
pub use resolve::{ModResolver, ResolveReport};
pub use server::{ServerProvisioner, ServerReport};

pub use mcdex_common::{Config, McdexError, Result};
