//! Command handlers behind the CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local};

use crate::action::{CollisionPolicy, DisposalAction};
use crate::categories;
use crate::cleaner::ScanPlan;
use crate::cli::{
    ActionArg, CleanArgs, CollisionArg, Cli, Command, ConfigCommand, PreDisposalArg, TargetArgs,
};
use crate::config::{self, Settings};
use crate::hook::{HookKind, PreDisposal};
use crate::journal::Journal;
use crate::output;
use crate::prune;
use crate::report;
use crate::restore;
use crate::scan::{DisposalSummary, ScanEvent, ScanOptions};
use crate::schedule;
use crate::service::{DisposalService, WorkerMessage};
use crate::utils::{self, display_path};

pub fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let settings = Settings::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    match cli.command {
        Command::Scan { target } => scan(&target, &settings),
        Command::Clean(args) => {
            if !args.confirm {
                output::print_no_confirm_warning();
                return preview(&args, &settings);
            }
            let service = Arc::new(open_service(&settings));
            let summary = clean(&service, &args, &settings)?;
            output::print_summary(&summary);
            Ok(())
        }
        Command::Prune {
            path,
            mut skip,
            confirm,
        } => {
            skip.extend(settings.skip_dirs.iter().cloned());
            prune_dirs(&path, &skip, confirm)
        }
        Command::Backups { backup } => backups(backup.as_deref().unwrap_or(&settings.backup_folder)),
        Command::Restore { names, backup, to } => restore_cmd(&names, backup, to, &settings),
        Command::Report { export } => report_cmd(export.as_deref(), &settings),
        Command::Schedule { every, runs, clean } => schedule_cmd(&every, runs, &clean, &settings),
        Command::Presets => {
            presets(&settings);
            Ok(())
        }
        Command::Config { action } => config_cmd(action, &config_path, settings),
    }
}

/// Resolve the preset and apply rule overrides from the command line.
fn build_plan(target: &TargetArgs, settings: &Settings) -> Result<(&'static str, ScanPlan)> {
    let cleaner = categories::find_cleaner(&target.preset, &target.paths).ok_or_else(|| {
        anyhow!(
            "Unknown preset '{}'. Available: {}",
            target.preset,
            categories::all_cleaner_names().join(", ")
        )
    })?;
    let mut plan = cleaner.plan(settings)?;

    if !target.junk.is_empty() {
        plan.rule.junk = target.junk.clone();
    }
    if !target.exclude.is_empty() {
        plan.rule.excluded = target.exclude.clone();
    }
    if let Some(age) = &target.min_age {
        plan.rule.min_age = utils::parse_duration(age).map_err(anyhow::Error::msg)?;
    }
    if let Some(size) = &target.min_size {
        plan.rule.min_size = utils::parse_size(size).map_err(anyhow::Error::msg)?;
    }
    plan.rule.validate()?;
    Ok((cleaner.label(), plan))
}

fn build_options(args: &CleanArgs, plan: &ScanPlan, settings: &Settings) -> Result<ScanOptions> {
    let backup = args.backup.clone().unwrap_or_else(|| settings.backup_folder.clone());
    let action = match args.action {
        ActionArg::Delete => DisposalAction::DeletePermanently,
        ActionArg::Trash => DisposalAction::MoveToTrash(
            args.trash.clone().unwrap_or_else(|| settings.trash_folder.clone()),
        ),
        ActionArg::Backup => DisposalAction::MoveToBackup(backup.clone()),
    };

    let hook = match args.pre_disposal {
        PreDisposalArg::Never => None,
        PreDisposalArg::Copy => Some(HookKind::CopyToBackup(backup)),
        PreDisposalArg::Compress => Some(HookKind::Compress(backup)),
    };
    let pre_disposal = match hook {
        None => PreDisposal::Never,
        Some(kind) if args.ask => PreDisposal::ask(kind, ask_user),
        Some(kind) => PreDisposal::Always(kind),
    };

    let collision = match args.on_collision {
        Some(CollisionArg::Fail) => CollisionPolicy::Fail,
        Some(CollisionArg::Rename) => CollisionPolicy::Rename,
        None => settings.on_collision,
    };

    let options = ScanOptions::new(plan.rule.clone(), action)
        .with_pre_disposal(pre_disposal)
        .with_collision(collision)
        .with_prune(args.prune || settings.prune_empty_dirs)
        .with_skip_dirs(plan.skip_dirs.clone());
    options
        .validate()
        .context("--pre-disposal copy needs --action delete or --action trash")?;
    Ok(options)
}

fn ask_user(path: &Path) -> bool {
    dialoguer::Confirm::new()
        .with_prompt(format!("Keep a copy of {} first?", display_path(path)))
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// The log is opened once per process. If it cannot be opened the clean
/// still runs, with a warning.
fn open_service(settings: &Settings) -> DisposalService {
    let journal = match Journal::open(&settings.log_file) {
        Ok(j) => j,
        Err(e) => {
            output::print_warning(&format!("{e}; continuing without a disposal log"));
            Journal::disabled()
        }
    };
    DisposalService::new(journal).with_report_file(&settings.report_file)
}

fn scan(target: &TargetArgs, settings: &Settings) -> Result<()> {
    let (label, plan) = build_plan(target, settings)?;
    let options = ScanOptions::new(plan.rule.clone(), DisposalAction::DeletePermanently)
        .with_skip_dirs(plan.skip_dirs.clone());
    list_candidates(label, &plan, &options)
}

fn preview(args: &CleanArgs, settings: &Settings) -> Result<()> {
    let (label, plan) = build_plan(&args.target, settings)?;
    let options = build_options(args, &plan, settings)?;
    list_candidates(label, &plan, &options)
}

fn list_candidates(label: &str, plan: &ScanPlan, options: &ScanOptions) -> Result<()> {
    let service = DisposalService::new(Journal::disabled());
    let mut invalid = 0;

    for root in &plan.roots {
        output::print_scan_header(&format!("{label}: {}", display_path(root)));
        let classification = match service.preview(root, options) {
            Ok(c) => c,
            Err(e) => {
                output::print_warning(&e.to_string());
                invalid += 1;
                continue;
            }
        };
        for candidate in &classification.candidates {
            output::print_scan_entry(&display_path(&candidate.path), candidate.size_bytes);
        }
        for err in &classification.errors {
            output::print_warning(err);
        }
        let total: u64 = classification.candidates.iter().map(|c| c.size_bytes).sum();
        output::print_root_total(label, classification.candidates.len(), total);
    }

    output::print_dry_run_footer();
    if invalid > 0 {
        bail!("{invalid} root(s) could not be scanned");
    }
    Ok(())
}

/// Run one clean on the background worker, printing progress as it
/// arrives.
fn clean(service: &Arc<DisposalService>, args: &CleanArgs, settings: &Settings) -> Result<DisposalSummary> {
    let (label, plan) = build_plan(&args.target, settings)?;
    let options = Arc::new(build_options(args, &plan, settings)?);

    let (handle, rx) = service.spawn(plan.roots.clone(), options);
    let mut total = DisposalSummary::default();
    let mut invalid = 0;

    for msg in rx {
        match msg {
            WorkerMessage::Started(root) => {
                output::print_scan_header(&format!("{label}: {}", display_path(&root)));
            }
            WorkerMessage::Event(ScanEvent::Disposed {
                path,
                size_bytes,
                action,
                ..
            }) => output::print_disposed(&action.to_string(), &display_path(&path), size_bytes),
            WorkerMessage::Event(ScanEvent::Failed { path, reason }) => {
                output::print_delete_error(&display_path(&path), &reason)
            }
            WorkerMessage::Event(ScanEvent::Pruned(path)) => {
                output::print_pruned(&display_path(&path))
            }
            WorkerMessage::Finished(_, Ok(summary)) => total.merge(&summary),
            WorkerMessage::Finished(_, Err(e)) => {
                output::print_warning(&e.to_string());
                invalid += 1;
            }
            WorkerMessage::AllComplete => break,
        }
    }
    handle
        .join()
        .map_err(|_| anyhow!("clean worker panicked"))?;

    if invalid > 0 {
        output::print_summary(&total);
        bail!("{invalid} root(s) could not be scanned");
    }
    Ok(total)
}

fn prune_dirs(path: &Path, skip: &[String], confirm: bool) -> Result<()> {
    if !path.is_dir() {
        bail!("Invalid directory {}: not a directory", path.display());
    }
    output::print_scan_header(&format!("Empty folders: {}", display_path(path)));

    if !confirm {
        let found = prune::find_empty_dirs(path, &[], skip);
        for dir in &found {
            output::print_scan_entry(&display_path(dir), 0);
        }
        output::print_info(&format!(
            "{} empty directories. Run with --confirm to remove them.",
            found.len()
        ));
        return Ok(());
    }

    let removed = prune::prune_empty_dirs(path, &[], skip);
    for dir in &removed {
        output::print_pruned(&display_path(dir));
    }
    output::print_info(&format!("{} empty directories removed.", removed.len()));
    Ok(())
}

fn backups(backup_dir: &Path) -> Result<()> {
    let entries = restore::list_backups(backup_dir)?;
    output::print_scan_header(&format!("Backup folder: {}", display_path(backup_dir)));
    if entries.is_empty() {
        output::print_info("The backup folder is empty.");
        return Ok(());
    }
    for entry in &entries {
        let modified: DateTime<Local> = entry.modified.into();
        output::print_name_row(
            &entry.name,
            &format!(
                "{}  {}",
                utils::format_size(entry.size_bytes),
                modified.format("%Y-%m-%d %H:%M")
            ),
        );
    }
    Ok(())
}

fn restore_cmd(
    names: &[String],
    backup: Option<PathBuf>,
    to: Option<PathBuf>,
    settings: &Settings,
) -> Result<()> {
    let backup = backup.unwrap_or_else(|| settings.backup_folder.clone());
    let destination = match to.or_else(dirs::download_dir) {
        Some(dir) => dir,
        None => bail!("Could not locate the downloads folder, pass --to"),
    };
    let service = open_service(settings);

    let mut failed = 0;
    for (name, result) in restore::restore_files(&backup, names, &destination, service.journal()) {
        match result {
            Ok(path) => println!("  Restored {name} -> {}", display_path(&path)),
            Err(e) => {
                output::print_delete_error(&name, &e.to_string());
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} file(s) could not be restored");
    }
    Ok(())
}

fn report_cmd(export: Option<&Path>, settings: &Settings) -> Result<()> {
    let rows = report::read_rows(&settings.report_file)?;
    output::print_scan_header("Clean history");
    if rows.is_empty() {
        output::print_info("No completed cleans recorded yet.");
    }
    for row in &rows {
        output::print_report_row(
            &row.finished_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            row.files_disposed,
            row.freed_bytes,
        );
    }
    if let Some(path) = export {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        report::write_csv(std::io::BufWriter::new(file), &rows)?;
        output::print_info(&format!("Exported {} rows to {}", rows.len(), path.display()));
    }
    Ok(())
}

fn schedule_cmd(every: &str, runs: Option<usize>, args: &CleanArgs, settings: &Settings) -> Result<()> {
    let interval = utils::parse_duration(every).map_err(anyhow::Error::msg)?;
    // fail fast on a bad preset or rule instead of on every run
    build_plan(&args.target, settings)?;

    if !args.confirm {
        output::print_no_confirm_warning();
    }
    let service = Arc::new(open_service(settings));

    let failures = schedule::run_periodically(interval, runs, |_| -> Result<()> {
        if args.confirm {
            let summary = clean(&service, args, settings)?;
            output::print_summary(&summary);
            Ok(())
        } else {
            preview(args, settings)
        }
    });

    if failures > 0 {
        bail!("{failures} scheduled run(s) failed");
    }
    Ok(())
}

fn presets(settings: &Settings) {
    output::print_scan_header("Presets");
    for cleaner in categories::all_cleaners(&[]) {
        let detail = match cleaner.plan(settings) {
            Ok(plan) if !plan.roots.is_empty() => format!(
                "{} ({})",
                cleaner.label(),
                plan.roots
                    .iter()
                    .map(|r| display_path(r))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            _ => format!("{} (needs --path)", cleaner.label()),
        };
        output::print_name_row(cleaner.name(), &detail);
    }
}

fn config_cmd(action: ConfigCommand, path: &Path, mut settings: Settings) -> Result<()> {
    match action {
        ConfigCommand::Show => {
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&settings)?);
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Settings::default().save(path)?;
            output::print_info(&format!("Wrote {}", path.display()));
        }
        ConfigCommand::SetBackup { dir } => {
            settings.backup_folder = dir;
            settings.save(path)?;
            output::print_info(&format!(
                "Backup folder set to {}",
                settings.backup_folder.display()
            ));
        }
    }
    Ok(())
}
