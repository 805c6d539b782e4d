use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use walkdir::WalkDir;

use joosc::common::consts::{EXIT_ERROR, EXIT_EXCEPTION};
use joosc::{ast, common::error::Severity, parser, Config};

#[derive(Parser)]
#[command(name = "joosc")]
#[command(about = "Joos 1W compiler producing x86-32 assembly")]
#[command(version)]
struct Cli {
    /// Input .java files or directories to scan for them
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Disable optimizations (trivial register allocation); the default
    #[arg(long = "opt-none", conflicts_with = "opt")]
    opt_none: bool,

    /// Enable an optimization set (e.g. "reg-only")
    #[arg(long = "opt", value_name = "SET")]
    opt: Vec<String>,

    /// Only report errors
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Print phase progress
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Output directory for the generated .s files
    #[arg(long = "out", value_name = "DIR", default_value = "output")]
    out: PathBuf,

    /// Parse only and print the AST
    #[arg(long = "print-ast")]
    print_ast: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("joosc: internal error: {e:#}");
            ExitCode::from(EXIT_EXCEPTION as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let mut config = Config {
        quiet: cli.quiet,
        verbose: cli.verbose,
        output_dir: cli.out.clone(),
        ..Config::default()
    };
    if cli.opt_none {
        config.opt = joosc::OptLevel::None;
    }
    for name in &cli.opt {
        if let Err(message) = config.apply_opt_name(name) {
            // Unrecognized sets are reported and skipped, they are not fatal.
            eprintln!("joosc: {message}");
        }
    }

    let files = collect_inputs(&cli.inputs)?;
    if files.is_empty() {
        eprintln!("joosc: no input files");
        return Ok(EXIT_ERROR);
    }

    let mut sources = Vec::with_capacity(files.len());
    for path in &files {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        sources.push((path.display().to_string(), text));
    }

    if cli.print_ast {
        return print_asts(&sources);
    }

    let outcome = joosc::compile_program(&sources, &config);
    for diagnostic in &outcome.diagnostics {
        if cli.quiet && diagnostic.severity != Severity::Error {
            continue;
        }
        eprintln!("{diagnostic}");
    }

    if let Some(assembly) = &outcome.assembly {
        std::fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("creating {}", config.output_dir.display()))?;
        for (name, contents) in assembly {
            let path = config.output_dir.join(name);
            std::fs::write(&path, contents)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        if !cli.quiet {
            eprintln!(
                "joosc: wrote {} files to {}",
                assembly.len(),
                config.output_dir.display()
            );
        }
    }

    Ok(outcome.exit_code)
}

/// Expand the command line into an ordered list of .java files; the first
/// file names the start class.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "java")
                {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn print_asts(sources: &[(String, String)]) -> Result<i32> {
    let mut ids = parser::AstIds::new();
    for (file_name, source) in sources {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name)
            .trim_end_matches(".java");
        match parser::parse_unit(source, base, &mut ids) {
            Ok(unit) => print!("{}", ast::AstPrinter::new().print(&unit)),
            Err(e) => {
                eprintln!("{file_name}: {e}");
                return Ok(EXIT_ERROR);
            }
        }
    }
    Ok(0)
}
