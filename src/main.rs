use clap::Parser;
use colored::*;
use nginx2caddy::cli::{AnalyzeArgs, Cli, ColorChoice, Commands, ConvertArgs};
use nginx2caddy::diagnostics::{Diagnostics, Severity};
use nginx2caddy::{convert_with, ConversionResult, ConvertOptions};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }

    let result = match cli.command {
        Commands::Convert(args) => run_convert(args, cli.verbose, cli.quiet),
        Commands::Analyze(args) => run_analyze(args, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: &Path) -> Result<String, String> {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(content);
    }

    if !path.exists() {
        return Err(format!("File not found: {}", path.display()));
    }
    fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

fn convert_input(path: &Path, options: &ConvertOptions) -> Result<ConversionResult, String> {
    let content = read_input(path)?;
    info!(input = %path.display(), bytes = content.len(), "converting");
    convert_with(&content, options).map_err(|e| format!("{}: {}", path.display(), e))
}

fn run_convert(args: ConvertArgs, verbose: u8, quiet: bool) -> Result<(), String> {
    let options = args.options();
    let mut outputs = Vec::new();

    for input_path in &args.input {
        let result = convert_input(input_path, &options)?;

        if !quiet && !args.json {
            print_diagnostics(&result.diagnostics, verbose);
        }
        outputs.push(result);
    }

    let rendered = if args.json {
        serde_json::to_string_pretty(&outputs).map_err(|e| format!("Failed to encode JSON: {}", e))?
    } else {
        let blocks: Vec<&str> = outputs.iter().map(|r| r.caddyfile.as_str()).collect();
        blocks.join("\n\n")
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, format!("{}\n", rendered))
            .map_err(|e| format!("Failed to write output: {}", e))?;
        if !quiet {
            eprintln!("{} Wrote {}", "Success:".green().bold(), output_path.display());
        }
    } else {
        println!("{}", rendered);
    }

    Ok(())
}

fn run_analyze(args: AnalyzeArgs, verbose: u8) -> Result<(), String> {
    let options = args.options();

    for input_path in &args.input {
        let result = convert_input(input_path, &options)?;
        let diagnostics = &result.diagnostics;

        if args.json {
            let output = serde_json::json!({
                "file": input_path.display().to_string(),
                "diagnostics": diagnostics,
            });
            let text = serde_json::to_string_pretty(&output)
                .map_err(|e| format!("Failed to encode JSON: {}", e))?;
            println!("{}", text);
            continue;
        }

        println!("{}: {}", "Analyzing".cyan().bold(), input_path.display());
        println!();

        if !diagnostics.converted.is_empty() {
            println!("{}", "Converted:".green().bold());
            for item in &diagnostics.converted {
                println!("  {} -> {}{}", item.directive, item.target.cyan(), line_suffix(item.line));
            }
            println!();
        }

        if !diagnostics.skipped.is_empty() {
            println!("{}", "Kept as comments:".yellow().bold());
            for item in &diagnostics.skipped {
                println!("  {} ({}){}", item.directive, item.reason, line_suffix(item.line));
            }
            println!();
        }

        print_warnings(diagnostics);

        if diagnostics.is_clean() {
            println!("{}", "No issues found.".green());
            println!();
        }

        println!("{}", "Summary:".bold());
        println!("  Converted: {} directives", diagnostics.converted.len());
        println!("  Kept as comments: {}", diagnostics.skipped.len());
        println!("  Warnings: {}", diagnostics.warnings.len());
        if verbose > 0 {
            println!("  Output lines: {}", result.caddyfile.lines().count());
        }
    }

    Ok(())
}

fn line_suffix(line: Option<usize>) -> String {
    line.map(|l| format!(" [line {}]", l)).unwrap_or_default()
}

fn print_warnings(diagnostics: &Diagnostics) {
    for warning in &diagnostics.warnings {
        let prefix = match warning.severity {
            Severity::Info => "info".blue(),
            Severity::Warning => "warning".yellow(),
            Severity::Error => "error".red(),
        };

        eprintln!("{}: {}", prefix, warning.message);
        if let Some(line) = warning.line {
            eprintln!("  --> line {}", line);
        }
        eprintln!("  | {}", warning.source_directive);

        if let Some(suggestion) = &warning.suggestion {
            eprintln!("  = {}: {}", "suggestion".green(), suggestion);
        }
        eprintln!();
    }
}

fn print_diagnostics(diagnostics: &Diagnostics, verbose: u8) {
    print_warnings(diagnostics);

    // Print skipped items in verbose mode
    if verbose > 0 && !diagnostics.skipped.is_empty() {
        eprintln!("{}", "Kept as comments:".yellow());
        for skipped in &diagnostics.skipped {
            eprintln!("  - {} ({})", skipped.directive, skipped.reason);
        }
        eprintln!();
    }

    if verbose > 0 {
        eprintln!("{}", "Conversion summary:".bold());
        eprintln!("  Converted: {} directives", diagnostics.converted.len());
        eprintln!("  Warnings: {}", diagnostics.warnings.len());
        eprintln!("  Kept as comments: {}", diagnostics.skipped.len());
    }
}
