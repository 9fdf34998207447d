// src/cli/run_export.rs
use dialoguer::{theme::ColorfulTheme, Select};

use crate::export::{write_export, ExportFormat};
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn run_export(&self) -> Result<()> {
        let last_run = self.last_run.lock().await;
        let report = match last_run.as_ref() {
            Some(report) => report,
            None => {
                println!("\n😕 Nothing to export yet. Run a discovery first.");
                return Ok(());
            }
        };
        if report.table.is_empty() {
            println!("\n😕 The last run found no suppliers, so there is nothing to export.");
            return Ok(());
        }

        let choices = ["CSV", "Excel (xlsx)", "Both"];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Export {} suppliers as", report.table.len()))
            .items(&choices)
            .default(0)
            .interact()?;

        let formats: Vec<ExportFormat> = match selection {
            0 => vec![ExportFormat::Csv],
            1 => vec![ExportFormat::Xlsx],
            _ => vec![ExportFormat::Csv, ExportFormat::Xlsx],
        };

        for format in formats {
            match write_export(&report.table, format, &self.config.output.directory) {
                Ok(path) => println!("✅ Wrote {path}"),
                Err(e) => println!("❌ {format} export failed: {e}"),
            }
        }

        Ok(())
    }
}
