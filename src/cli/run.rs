// src/cli/run.rs
use dialoguer::{theme::ColorfulTheme, Select};

use crate::{
    cli::cli::MenuAction,
    models::{CliApp, Result},
};
use tracing::error;

impl CliApp {
    pub async fn run(&self) -> Result<()> {
        println!("\n🏭 Welcome to Supplier Finder!");
        println!("═══════════════════════════════════════");

        loop {
            let actions = vec![
                MenuAction::RunDiscovery,
                MenuAction::ExportResults,
                MenuAction::EnvironmentCheck,
                MenuAction::Exit,
            ];

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("\nSelect an action")
                .default(0)
                .items(&actions)
                .interact()?;

            match &actions[selection] {
                MenuAction::RunDiscovery => {
                    if let Err(e) = self.run_discovery().await {
                        error!("Discovery failed: {}", e);
                    }
                }
                MenuAction::ExportResults => {
                    if let Err(e) = self.run_export().await {
                        error!("Export failed: {}", e);
                    }
                }
                MenuAction::EnvironmentCheck => {
                    if let Err(e) = self.check_environment().await {
                        error!("Environment check failed: {}", e);
                    }
                }
                MenuAction::Exit => {
                    println!("\n👋 Thanks for using Supplier Finder!");
                    break;
                }
            }
        }

        Ok(())
    }
}
