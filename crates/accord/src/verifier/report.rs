//! Terminal output for verification runs.

use super::result::{InteractionResult, VerificationReport};

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub fn print_header(base_url: &str, contracts: usize) {
    println!("{BOLD}{CYAN}Accord Provider Verifier{RESET}");
    println!("{RULE}");
    println!("Provider:  {base_url}");
    println!("Contracts: {contracts}");
    println!();
}

/// Print one line per interaction, with mismatch details for failures.
pub fn print_report(report: &VerificationReport, verbose: bool) {
    println!(
        "{}Contract:{} {} -> {}",
        BOLD, RESET, report.consumer, report.provider
    );
    if report.results.is_empty() {
        println!("   └─ {YELLOW}No interactions{RESET}");
        println!();
        return;
    }
    for result in &report.results {
        print_result(result, verbose);
    }
    println!();
}

fn print_result(result: &InteractionResult, verbose: bool) {
    if result.passed() {
        println!(
            "   {GREEN}✓{RESET} {} {DIM}({}ms){RESET}",
            result.label(),
            result.duration_ms
        );
        return;
    }
    println!(
        "   {RED}✗{RESET} {} {DIM}({}ms){RESET}",
        result.label(),
        result.duration_ms
    );
    if let Some(ref error) = result.error {
        println!("      {RED}Error:{RESET} {error}");
    }
    for mismatch in &result.mismatches {
        match mismatch.diff() {
            Some(diff) if verbose => {
                println!("      {}: {}", mismatch.path, mismatch.kind.reason());
                for line in diff.lines() {
                    println!("        {line}");
                }
            }
            _ => {
                println!("      {}: {}", mismatch.path, mismatch.kind.reason());
                println!("        Expected: {}", one_line(&mismatch.expected));
                println!("        {RED}Actual:   {}{RESET}", one_line(&mismatch.actual));
            }
        }
    }
}

/// Totals over every contract of the run.
pub fn print_summary(reports: &[VerificationReport]) {
    let total: usize = reports.iter().map(|r| r.results.len()).sum();
    let passed: usize = reports.iter().map(VerificationReport::passed_count).sum();
    let failed = total - passed;

    println!("{RULE}");
    println!("{BOLD}Verification Summary{RESET}");
    println!("{RULE}");
    println!("  Contracts:    {}", reports.len());
    println!("  Interactions: {total}");
    println!();
    println!("  {GREEN}Passed:  {passed}{RESET}");
    println!("  {RED}Failed:  {failed}{RESET}");
    println!();

    if failed == 0 {
        println!("{GREEN}All interactions verified!{RESET}");
    } else {
        println!("{RED}{failed} interaction(s) failed. See details above.{RESET}");
    }
}

/// Collapse pretty-printed JSON onto one line for compact output.
fn one_line(text: &str) -> String {
    if !text.contains('\n') {
        return text.to_string();
    }
    serde_json::from_str::<serde_json::Value>(text)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line() {
        assert_eq!(one_line("\"BMW\""), "\"BMW\"");
        assert_eq!(one_line("{\n  \"id\": \"1\"\n}"), r#"{"id":"1"}"#);
        assert_eq!(one_line("<missing>"), "<missing>");
    }
}
