// mcdex/src/cli/list_mods.rs
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use mcdex_common::error::Result;
use mcdex_common::model::SourceKind;
use mcdex_core::PackController;
use prettytable::{format, Cell, Row, Table};

#[derive(Args, Debug)]
pub struct ListMods {
    /// Pack directory
    pub dir: PathBuf,
}

fn id_cell(value: Option<u64>) -> Cell {
    Cell::new(&value.map_or_else(|| "-".to_string(), |v| v.to_string()))
}

impl ListMods {
    pub fn run(&self, controller: &PackController) -> Result<()> {
        let pack = controller.open(&self.dir)?;
        let manifest = &pack.manifest;
        println!(
            "{} (Minecraft {}, forge {})",
            pack.name().cyan().bold(),
            manifest.platform_version(),
            manifest.loader_version().unwrap_or("-")
        );
        if manifest.files.is_empty() {
            println!("{}", "No mods registered".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Name").style_spec("b"),
            Cell::new("Project").style_spec("b"),
            Cell::new("File").style_spec("b"),
            Cell::new("Source").style_spec("b"),
            Cell::new("Kind").style_spec("b"),
            Cell::new("Installed").style_spec("b"),
        ]));
        for reference in &manifest.files {
            let source = match reference.source {
                SourceKind::Repository => Cell::new("repository").style_spec("Fg"),
                SourceKind::Explicit => Cell::new("url").style_spec("Fy"),
            };
            table.add_row(Row::new(vec![
                Cell::new(&reference.display_name()).style_spec("Fb"),
                id_cell(reference.project_id),
                id_cell(reference.file_id),
                source,
                Cell::new(if reference.dependency { "dependency" } else { "explicit" }),
                Cell::new(if reference.installed { "✔" } else { "" }),
            ]));
        }
        table.printstd();

        let dependencies = manifest.files.iter().filter(|r| r.dependency).count();
        println!(
            "{} mods ({} pulled in as dependencies)",
            manifest.files.len().to_string().bold(),
            dependencies
        );
        Ok(())
    }
}
