use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.chars().count()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_warning(text: &str) {
    println!("{}", text.yellow());
}

/// `label: value` with the label dimmed.
pub fn print_field(label: &str, value: &str) {
    println!("  {} {}", format!("{}:", label).dimmed(), value);
}
