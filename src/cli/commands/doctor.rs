//! Doctor command - verify configuration, provider and store.

use crate::cli::preflight::find_executable;
use crate::cli::Output;
use crate::config::{Settings, StoreBackend};
use crate::error::KikkError;
use crate::vector_store::{JsonVectorStore, Snapshot, VectorStore};
use console::style;
use std::collections::BTreeSet;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Kikk Doctor");
    println!();

    let sections = [
        ("Configuration", vec![check_config(settings)]),
        ("Embedding Provider", vec![check_provider(settings)]),
        ("Vector Store", vec![check_store(settings).await]),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.status {
                CheckStatus::Error => errors += 1,
                CheckStatus::Warning => warnings += 1,
                CheckStatus::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Kikk.",
            errors
        ));
        return Err(anyhow::anyhow!("{} doctor check(s) failed", errors));
    }

    if warnings > 0 {
        Output::warning(&format!("{} warning(s). Kikk should work.", warnings));
    } else {
        Output::success("All checks passed!");
    }

    Ok(())
}

fn check_config(settings: &Settings) -> CheckResult {
    let path = Settings::default_config_path();
    if let Err(e) = settings.validate() {
        return CheckResult::error("Config", &e.to_string(), "Fix the value in your config file");
    }
    if path.exists() {
        CheckResult::ok("Config", &format!("{}", path.display()))
    } else {
        CheckResult::warning(
            "Config",
            "No config file, using defaults",
            "Create one with: kikk config init",
        )
    }
}

fn check_provider(settings: &Settings) -> CheckResult {
    let Some(program) = settings.embedding.command.first() else {
        return CheckResult::error(
            "Provider",
            "embedding.command is empty",
            "Set embedding.command in your config file",
        );
    };

    match find_executable(program) {
        Some(path) => CheckResult::ok(
            "Provider",
            &format!(
                "{} (video: {}, text: {}, timeout {}s)",
                path.display(),
                settings.embedding.video_model,
                settings.embedding.text_model,
                settings.embedding.timeout_secs
            ),
        ),
        None => CheckResult::error(
            "Provider",
            &format!("'{}' not found", program),
            "Install the provider executable or point embedding.command at it",
        ),
    }
}

async fn check_store(settings: &Settings) -> CheckResult {
    if settings.store.backend == StoreBackend::Memory {
        return CheckResult::warning(
            "Store",
            "In-memory backend, nothing is persisted",
            "Set store.backend = \"json\" to keep an index",
        );
    }

    let path = settings.store_path();
    let store = match JsonVectorStore::new(&path) {
        Ok(store) => store,
        Err(e) => {
            return CheckResult::error("Store", &e.to_string(), "Check the store path permissions")
        }
    };

    match store.load().await {
        Ok(snapshot) => store_summary(&path.display().to_string(), &snapshot),
        Err(e @ KikkError::StoreCorrupt { .. }) => CheckResult::error(
            "Store",
            &e.to_string(),
            "Restore the file from a backup or move it aside to start a new index",
        ),
        Err(e) => CheckResult::error("Store", &e.to_string(), "Check the store path permissions"),
    }
}

fn store_summary(location: &str, snapshot: &Snapshot) -> CheckResult {
    let dimensions: BTreeSet<usize> = snapshot.values().map(|r| r.dimensions()).collect();

    if dimensions.len() > 1 {
        return CheckResult::warning(
            "Store",
            &format!(
                "{} records with mixed dimensions {:?}",
                snapshot.len(),
                dimensions
            ),
            "Records that differ from the query size are skipped during search",
        );
    }

    let dims = dimensions
        .iter()
        .next()
        .map(|d| format!(", {} dimensions", d))
        .unwrap_or_default();
    CheckResult::ok("Store", &format!("{} ({} records{})", location, snapshot.len(), dims))
}
