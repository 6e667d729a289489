use clap::{Parser, Subcommand};
use log::LevelFilter;
use lpstep_lang::{Extraction, Extractor, Fallback, solve_text};
use lpstep_solver::{SolveStatus, Solver, report};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lpstep")]
#[command(about = "Step-by-step simplex solver for small linear programs", long_about = None)]
struct Cli {
    /// Log every tableau and pivot
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem and print the step-by-step report
    Solve {
        /// The problem text (`-` reads stdin)
        file: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Require a data block
        #[arg(long, conflicts_with = "heuristic_only")]
        strict: bool,
        /// Search free text when there is no data block, never use the placeholder problem
        #[arg(long)]
        heuristic_only: bool,
        /// Print the standard form before solving
        #[arg(long)]
        standard_form: bool,
        /// Pivot budget
        #[arg(long, default_value_t = 100)]
        max_iterations: usize,
    },
    /// Extract the problem and print it
    Parse {
        /// The problem text (`-` reads stdin)
        file: PathBuf,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Report dropped lines and extraction confidence
    Check {
        /// The problem text (`-` reads stdin)
        file: PathBuf,
    },
}

fn read_input(file: &Path) -> String {
    let result = if file.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source).map(|_| source)
    } else {
        std::fs::read_to_string(file)
    };
    match result {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading input: {}", e);
            std::process::exit(1);
        }
    }
}

fn extract(source: &str, extractor: &Extractor) -> Extraction {
    match extractor.extract(source) {
        Ok(extraction) => extraction,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_dropped(dropped: &[lpstep_lang::DroppedLine]) {
    for line in dropped {
        eprintln!("  line {}: {} ({})", line.line_number, line.text, line.reason);
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Solve {
            file,
            json,
            strict,
            heuristic_only,
            standard_form,
            max_iterations,
        } => {
            let source = read_input(&file);
            let fallback = if strict {
                Fallback::Strict
            } else if heuristic_only {
                Fallback::Heuristic
            } else {
                Fallback::Placeholder
            };
            let extractor = Extractor::new().with_fallback(fallback);
            let solver = Solver::new().with_max_iterations(max_iterations);

            let solved = solve_text(&source, &extractor, &solver);

            if json {
                match serde_json::to_string_pretty(&solved.result) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error serializing result: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                if !solved.is_authoritative() {
                    if let Some(confidence) = solved.confidence {
                        eprintln!(
                            "Warning: no data block found, problem extracted with {} confidence",
                            confidence.label()
                        );
                    }
                }
                if !solved.dropped.is_empty() {
                    eprintln!("Warning: {} line(s) were ignored:", solved.dropped.len());
                    print_dropped(&solved.dropped);
                }
                if standard_form {
                    if let Some(problem) = &solved.problem {
                        println!("{}", report::render_standard_form(problem));
                    }
                }
                println!("{}", report::render(&solved.result));
            }

            if solved.result.status != SolveStatus::Optimal {
                std::process::exit(1);
            }
        }
        Commands::Parse { file, format } => {
            let source = read_input(&file);
            let extraction = extract(&source, &Extractor::new());

            if format == "json" {
                match serde_json::to_string_pretty(&extraction) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error serializing problem: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                println!("Confidence: {}", extraction.confidence.label());
                println!("{}", report::render_standard_form(&extraction.problem));
            }
        }
        Commands::Check { file } => {
            let source = read_input(&file);
            let extraction = extract(&source, &Extractor::new());

            println!("Confidence: {}", extraction.confidence.label());
            println!(
                "Variables: {} | Constraints: {}",
                extraction.problem.num_variables(),
                extraction.problem.num_constraints()
            );
            if extraction.dropped.is_empty() {
                println!("OK");
            } else {
                println!("Dropped lines:");
                for line in &extraction.dropped {
                    println!("  line {}: {} ({})", line.line_number, line.text, line.reason);
                }
                std::process::exit(1);
            }
        }
    }
}
