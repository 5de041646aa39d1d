use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::info;

use phelc::compiler::{extract_namespace, Compiler};
use phelc::config::CompileOptions;
use phelc::devtools;
use phelc::error::Diagnostic;
use phelc::logging;

#[derive(Parser, Debug, Clone)]
#[command(name = "phelc", about = "Compiles Phel source files to PHP", version)]
struct Cli {
    /// Emit source map comments before each compiled form
    #[arg(long, default_value_t = false)]
    source_map: bool,
    /// Print the analyzed tree of every form to stderr
    #[arg(long, default_value_t = false)]
    print_ast: bool,
    /// Print the namespace and its dependencies instead of compiling
    #[arg(long, default_value_t = false)]
    extract_ns: bool,
    /// Do not install the core macros and inline functions
    #[arg(long, default_value_t = false)]
    no_prelude: bool,
    /// Namespace for forms that come before any `ns` form
    #[arg(long)]
    namespace: Option<String>,
    /// Log level for the compiler (trace|debug|info|warn|error); overrides RUST_LOG
    #[arg(long, value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,
    /// Raise compiler logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "log_level")]
    verbose: u8,
    /// Write the PHP output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Phel source file
    file: PathBuf,
}

impl Cli {
    fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref().or_else(|| logging::verbosity_level(self.verbose))
    }

    fn options(&self) -> CompileOptions {
        let mut options = CompileOptions::default();
        if self.source_map {
            options = options.with_source_maps();
        }
        if self.no_prelude {
            options = options.without_prelude();
        }
        if let Some(ns) = &self.namespace {
            options = options.with_default_namespace(ns.as_str());
        }
        options
    }
}

enum CliError {
    Io(String),
    Compile { diagnostic: Diagnostic, source: String },
}

fn try_main(cli: &Cli) -> Result<(), CliError> {
    let file = cli.file.display().to_string();
    let source = fs::read_to_string(&cli.file).map_err(|e| CliError::Io(format!("cannot read {}: {}", file, e)))?;
    let compile_error = |diagnostic| CliError::Compile { diagnostic, source: source.clone() };

    if cli.extract_ns {
        let info = extract_namespace(&source, &file).map_err(compile_error)?;
        println!("{}", info.namespace);
        for dependency in &info.dependencies {
            println!("{}", dependency);
        }
        return Ok(());
    }

    let mut compiler = Compiler::new(cli.options());

    if cli.print_ast {
        let mut ast_compiler = Compiler::new(cli.options());
        for node in ast_compiler.analyze_source(&source, &file).map_err(compile_error)? {
            eprintln!("{}", devtools::pretty_print_ast(&node));
        }
    }

    let unit = compiler.compile(&source, &file).map_err(compile_error)?;
    let php = format!("<?php\n\n{}", unit.code);

    match &cli.output {
        Some(path) => {
            fs::write(path, php).map_err(|e| CliError::Io(format!("cannot write {}: {}", path.display(), e)))?;
            info!(target: "phelc", forms = unit.forms.len(), output = %path.display(), "compiled");
        }
        None => print!("{}", php),
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level());

    if let Err(err) = try_main(&cli) {
        match err {
            CliError::Io(message) => eprintln!("error: {}", message),
            CliError::Compile { diagnostic, source } => eprintln!("{}", diagnostic.format_error(&source)),
        }
        process::exit(1);
    }
}
