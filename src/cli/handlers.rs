use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use timeledger_config::{ConfigManager, EngineSettings};
use timeledger_domain::MonthKey;

use crate::alerts::{AlertEvaluator, RecordingSink};
use crate::core::services::{EvaluationService, WindowRequest};
use crate::core::simulation::Scenario;
use crate::errors::{CliError, CliResult};
use crate::provider::JsonDataProvider;
use crate::utils::{build_info, DEFAULT_LOG_DIRECTIVE};

use super::args::{Cli, Command, ConfigCommand, WindowArgs};
use super::output;

/// Executes one parsed command line.
pub fn run(cli: Cli) -> CliResult<()> {
    output::set_preferences(output::OutputPreferences {
        quiet_mode: cli.quiet,
        plain_mode: cli.plain,
    });
    let manager = match cli.config_dir {
        Some(dir) => ConfigManager::with_base_dir(dir)?,
        None => ConfigManager::from_default_location()?,
    };
    let directive = manager
        .load()
        .map(|settings| settings.log_filter)
        .unwrap_or_else(|_| DEFAULT_LOG_DIRECTIVE.to_string());
    crate::init_with(&directive);

    match cli.command {
        Command::Evaluate {
            data,
            user,
            scenario,
            window,
        } => {
            let service = service(&manager, data)?;
            let comparison = service.evaluate(user, scenario, request(&window), window.as_of)?;
            report_warnings(&comparison.scenario.warnings);
            output::success(format!(
                "evaluated scenario {} over {} months",
                scenario,
                comparison.months.len()
            ));
            output::emit_json(&comparison)
        }
        Command::Preview {
            data,
            user,
            scenario_file,
            window,
        } => {
            let service = service(&manager, data)?;
            let scenario = read_scenario(&scenario_file)?;
            let comparison = service.preview(user, &scenario, request(&window), window.as_of)?;
            report_warnings(&comparison.scenario.warnings);
            output::success(format!(
                "previewed `{}` ({} ops) over {} months",
                scenario.name,
                scenario.op_count(),
                comparison.months.len()
            ));
            output::emit_json(&comparison)
        }
        Command::Aggregate { data, user, window } => {
            let service = service(&manager, data)?;
            let grid = service.window(request(&window), window.as_of)?;
            let result = service.run(user, &grid, window.as_of)?;
            report_warnings(&result.warnings);
            output::emit_json(&result)
        }
        Command::Alerts { data, month } => alerts(&manager, data, month),
        Command::Config { command } => config(&manager, command),
        Command::Version => {
            let meta = build_info::current();
            output::section(format!("Timeledger {}", meta.short()));
            output::emit_json(&meta)
        }
    }
}

fn request(window: &WindowArgs) -> WindowRequest {
    WindowRequest::new(window.from, window.to)
}

fn service(manager: &ConfigManager, data: Option<PathBuf>) -> CliResult<EvaluationService> {
    let settings = manager.load()?;
    let path = data
        .or_else(|| settings.default_dataset.clone())
        .ok_or_else(|| {
            CliError::Input("no dataset given; pass --data or set default_dataset".into())
        })?;
    let provider = JsonDataProvider::load(&path)?;
    output::info(format!("dataset {}", path.display()));
    Ok(EvaluationService::new(Arc::new(provider), settings))
}

fn read_scenario(path: &Path) -> CliResult<Scenario> {
    let data = fs::read_to_string(path)
        .map_err(|err| CliError::Input(format!("cannot read {}: {}", path.display(), err)))?;
    Ok(serde_json::from_str(&data)?)
}

fn report_warnings(warnings: &[String]) {
    for warning in warnings {
        output::warning(warning);
    }
}

fn alerts(manager: &ConfigManager, data: Option<PathBuf>, month: MonthKey) -> CliResult<()> {
    let service = service(manager, data)?;
    let sink = RecordingSink::new();
    let summary = AlertEvaluator::new(&service).run(month, &sink)?;
    output::section(format!("Alerts for {}", month));
    output::info(format!(
        "evaluated {}, fired {}, suppressed {}, skipped {}, failed {}",
        summary.evaluated, summary.fired, summary.suppressed, summary.skipped, summary.failed
    ));
    output::emit_json(&serde_json::json!({
        "month": month,
        "summary": summary,
        "notifications": sink.delivered(),
    }))
}

fn config(manager: &ConfigManager, command: ConfigCommand) -> CliResult<()> {
    match command {
        ConfigCommand::Show => {
            let settings = manager.load()?;
            output::info(format!("settings file {}", manager.config_path().display()));
            output::emit_json(&settings)
        }
        ConfigCommand::Init { force } => {
            if manager.config_path().exists() && !force {
                return Err(CliError::Command(format!(
                    "{} already exists; use --force to overwrite",
                    manager.config_path().display()
                )));
            }
            manager.save(&EngineSettings::default())?;
            output::success(format!("wrote {}", manager.config_path().display()));
            Ok(())
        }
        ConfigCommand::Backup { note } => {
            let settings = manager.load()?;
            let name = manager.backup(&settings, note.as_deref())?;
            output::success(format!("backup {}", name));
            Ok(())
        }
        ConfigCommand::Backups => {
            let backups = manager.list_backups()?;
            if backups.is_empty() {
                output::info("no backups yet");
            }
            output::emit_json(&backups)
        }
        ConfigCommand::Restore { name } => {
            manager.restore(&name)?;
            output::success(format!("restored settings from {}", name));
            Ok(())
        }
    }
}

