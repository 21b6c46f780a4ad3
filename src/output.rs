use colored::Colorize;

use crate::scan::DisposalSummary;
use crate::utils::format_size;

pub fn print_scan_header(label: &str) {
    println!("{}", format!("=== {label} ===").bold().white());
}

pub fn print_scan_entry(path: &str, size: u64) {
    println!("  {}  {}", path.dimmed(), format_size(size).yellow());
}

pub fn print_root_total(label: &str, count: usize, bytes: u64) {
    println!(
        "  {} {} in {} files",
        format!("{label} total:").bold(),
        format_size(bytes).green(),
        count
    );
    println!();
}

pub fn print_separator() {
    println!("  {}", "─".repeat(45).dimmed());
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "Warning:".red().bold(), msg.red());
}

pub fn print_info(msg: &str) {
    println!("{} {}", "Info:".cyan().bold(), msg);
}

pub fn print_dry_run_footer() {
    println!(
        "{}",
        "This was a dry run. Run `tidysweep clean --confirm` to dispose of these files."
            .yellow()
            .bold()
    );
}

pub fn print_no_confirm_warning() {
    println!(
        "{}",
        "No --confirm flag provided. Running as dry-run scan."
            .yellow()
            .bold()
    );
    println!();
}

pub fn print_disposed(action: &str, path: &str, size: u64) {
    println!(
        "  {} {}  {}",
        action.red(),
        path.dimmed(),
        format_size(size).yellow()
    );
}

pub fn print_delete_error(path: &str, err: &str) {
    println!("  {} {} - {}", "Failed".red().bold(), path.dimmed(), err.red());
}

pub fn print_pruned(path: &str) {
    println!("  {} {}", "Pruned".cyan(), path.dimmed());
}

/// "N files disposed, M freed, K failures".
pub fn print_summary(summary: &DisposalSummary) {
    print_separator();
    let line = format!(
        "{} files disposed, {} freed, {} failures",
        summary.disposed,
        format_size(summary.freed_bytes),
        summary.failed
    );
    if summary.failed == 0 {
        println!("{} {}", "Cleaned!".green().bold(), line.green());
    } else {
        println!("{} {}", "Cleaned with errors.".yellow().bold(), line.yellow());
        println!(
            "  {} {}",
            "Actually removed:".bold(),
            format_size(summary.confirmed_bytes).green()
        );
    }
    if summary.pruned_dirs > 0 {
        println!("  {} empty directories pruned", summary.pruned_dirs);
    }
    if summary.log_warnings > 0 {
        print_warning(&format!(
            "{} entries could not be written to the disposal log",
            summary.log_warnings
        ));
    }
    println!();
}

pub fn print_name_row(name: &str, detail: &str) {
    println!("  {:<30} {}", name, detail.dimmed());
}

pub fn print_report_row(timestamp: &str, files: usize, bytes: u64) {
    println!(
        "  {:<28} {:>8} files  {}",
        timestamp,
        files,
        format_size(bytes).green()
    );
}
