// src/cli/cli.rs
use crate::config::Config;
use crate::models::CliApp;

#[derive(Debug, Clone)]
pub enum MenuAction {
    RunDiscovery,
    ExportResults,
    EnvironmentCheck,
    Exit,
}

impl std::fmt::Display for MenuAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MenuAction::RunDiscovery => write!(f, "🔎 Find suppliers"),
            MenuAction::ExportResults => write!(f, "📤 Export last results (CSV / Excel)"),
            MenuAction::EnvironmentCheck => write!(f, "🔧 Check environment & API keys"),
            MenuAction::Exit => write!(f, "🚪 Exit"),
        }
    }
}

impl CliApp {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            last_run: tokio::sync::Mutex::new(None),
        }
    }
}
