//! Accord contract linter CLI
//!
//! Validates recorded contract files before they are published or replayed.
//!
//! Usage:
//!   accord-lint <directory_or_file> [OPTIONS]

use accord_lint::{load_contract, lint_value, LintIssue, LintOptions, LintResult, Severity};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    Text,
    Json,
}

/// Accord Contract Linter
#[derive(Parser, Debug)]
#[command(name = "accord-lint")]
#[command(author, version, about = "Validate recorded contract files")]
struct Args {
    /// Contract file or directory containing contract files
    #[arg(required = true)]
    path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: Output,

    /// Only show errors (hide warnings)
    #[arg(short = 'e', long)]
    errors_only: bool,

    /// Do not warn about interactions without a provider state
    #[arg(long)]
    allow_missing_state: bool,

    /// Strict mode - treat warnings as errors
    #[arg(short, long)]
    strict: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let text = matches!(args.output, Output::Text);

    if text {
        println!("{BOLD}{CYAN}Accord Contract Linter{RESET}");
        println!("{DIM}{RULE}{RESET}");
    }

    let files = collect_contract_files(&args.path);
    if files.is_empty() {
        if text {
            println!(
                "{YELLOW}Warning:{RESET} No JSON files found in {}",
                args.path.display()
            );
        }
        return ExitCode::SUCCESS;
    }

    if text {
        println!("{DIM}Scanning:{RESET} {CYAN}{}{RESET}", args.path.display());
        println!(
            "{DIM}Found:{RESET}    {BOLD}{}{RESET} contract file(s)\n",
            files.len()
        );
    }

    let options = LintOptions {
        require_provider_state: !args.allow_missing_state,
    };
    let mut result = LintResult::new();
    let mut pairs: BTreeMap<(String, String), Vec<PathBuf>> = BTreeMap::new();

    for file in &files {
        match load_contract(file) {
            Ok(contract) => {
                if let Some(pair) = participants(&contract) {
                    pairs.entry(pair).or_default().push(file.clone());
                }
                result.merge(lint_value(&contract, &file.to_string_lossy(), &options));
            }
            Err(e) => {
                result.files_checked += 1;
                result.add_issue(e.into_issue(file));
            }
        }
    }

    check_pair_conflicts(&pairs, &mut result);

    match args.output {
        Output::Json => print_results_json(&result),
        Output::Text => print_results(&result, &args),
    }

    let failed = result.has_errors() || (args.strict && result.has_warnings());
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn collect_contract_files(path: &Path) -> Vec<PathBuf> {
    let is_json = |p: &Path| p.extension().is_some_and(|ext| ext == "json");
    let mut files = Vec::new();

    if path.is_file() {
        if is_json(path) {
            files.push(path.to_path_buf());
        }
    } else if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let entry_path = entry.path();
            if entry_path.is_file() && is_json(&entry_path) {
                files.push(entry_path);
            }
        }
    }

    files.sort();
    files
}

fn participants(contract: &Value) -> Option<(String, String)> {
    let name = |field: &str| {
        contract
            .get(field)?
            .get("name")?
            .as_str()
            .map(str::to_string)
    };
    Some((name("consumer")?, name("provider")?))
}

/// Two files for the same pair would overwrite each other when published.
fn check_pair_conflicts(
    pairs: &BTreeMap<(String, String), Vec<PathBuf>>,
    result: &mut LintResult,
) {
    for ((consumer, provider), files) in pairs {
        if files.len() < 2 {
            continue;
        }
        let names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap_or_default().to_string_lossy().to_string())
            .collect();
        result.add_issue(
            LintIssue::error(
                "E011",
                format!(
                    "{consumer} -> {provider} is recorded in {} files: {}",
                    files.len(),
                    names.join(", ")
                ),
                files[0].clone(),
            )
            .with_suggestion("Keep a single contract file per consumer/provider pair"),
        );
    }
}

fn print_results_json(result: &LintResult) {
    match serde_json::to_string_pretty(result) {
        Ok(output) => println!("{output}"),
        Err(e) => eprintln!("{RED}Error:{RESET} failed to serialize results: {e}"),
    }
}

fn print_results(result: &LintResult, args: &Args) {
    if result.issues.is_empty() {
        println!("{GREEN}{BOLD}No issues found!{RESET}");
    } else {
        let mut issues_by_file: HashMap<&PathBuf, Vec<&LintIssue>> = HashMap::new();
        for issue in &result.issues {
            if args.errors_only && issue.severity != Severity::Error {
                continue;
            }
            issues_by_file.entry(&issue.file).or_default().push(issue);
        }

        let mut files: Vec<_> = issues_by_file.keys().copied().collect();
        files.sort();

        for file in files {
            print_file_issues(file, &issues_by_file[file]);
        }
    }

    println!("{DIM}{RULE}{RESET}");
    println!("{BOLD}{CYAN}Summary{RESET}");
    println!("{DIM}{RULE}{RESET}");
    println!(
        "  {DIM}Files checked:{RESET} {BOLD}{}{RESET}",
        result.files_checked
    );
    if result.errors > 0 {
        println!("  {RED}Errors:{RESET}    {BOLD}{RED}{}{RESET}", result.errors);
    } else {
        println!("  {GREEN}Errors:{RESET}    {BOLD}{GREEN}0{RESET}");
    }
    if result.warnings > 0 {
        println!(
            "  {YELLOW}Warnings:{RESET}  {BOLD}{YELLOW}{}{RESET}",
            result.warnings
        );
    } else {
        println!("  {DIM}Warnings:{RESET}  {BOLD}0{RESET}");
    }
    println!();

    if result.errors == 0 && result.warnings == 0 {
        println!("{GREEN}{BOLD}All checks passed!{RESET}");
    } else if result.errors == 0 && !args.strict {
        println!("{YELLOW}{BOLD}Passed with warnings{RESET}");
    } else {
        println!("{RED}{BOLD}Linting failed{RESET}");
    }
}

fn print_file_issues(file: &Path, issues: &[&LintIssue]) {
    let errors = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    let warnings = issues.len() - errors;

    let status = if errors > 0 {
        format!("{RED}FAIL{RESET}")
    } else {
        format!("{YELLOW}WARN{RESET}")
    };
    let mut counts = Vec::new();
    if errors > 0 {
        counts.push(format!("{RED}{errors} error(s){RESET}"));
    }
    if warnings > 0 {
        counts.push(format!("{YELLOW}{warnings} warning(s){RESET}"));
    }
    let file_name = file.file_name().unwrap_or_default().to_string_lossy();
    println!(
        "{status} {BOLD}{CYAN}{file_name}{RESET} {DIM}({RESET}{}{DIM}){RESET}",
        counts.join(", ")
    );

    for issue in issues {
        let color = severity_color(issue.severity);
        let location = issue
            .location
            .as_ref()
            .map(|l| format!("{DIM}[{RESET}{CYAN}{l}{RESET}{DIM}]{RESET} "))
            .unwrap_or_default();
        println!(
            "  {color}|{RESET} {location}{BOLD}{color}{}{RESET}: {} {DIM}({color}{}{DIM}){RESET}",
            issue.severity.label(),
            issue.message,
            issue.code
        );
        if let Some(suggestion) = &issue.suggestion {
            println!("  {color}|{RESET}   {GREEN}-> {suggestion}{RESET}");
        }
    }
    println!();
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
    }
}
