// bazaconv: turn the SQLite nutrition dump (baza.sql) into PostgreSQL scripts.
// `convert` writes a single denormalized products_nutrition table, `fix`
// rewrites the dump into a categories + products schema, `from-json` builds
// the products_nutrition script from a JSON product list and `from-table`
// from a plain-text calorie table.

mod category;
mod error;
mod logger;
mod parser;
mod pipeline;
mod progress;
mod sql;
mod writer;

use category::CategoryTable;
use clap::{CommandFactory, Parser, Subcommand};
use pipeline::normalized::NormalizedConverter;
use pipeline::nutrition::NutritionConverter;
use pipeline::RunReport;
use progress::ProgressManager;
use std::io::{self, Write};
use std::path::PathBuf;

const DEFAULT_DUMP: &str = "baza.sql";

// Command-line flags and subcommands.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Enable debug logging (disables progress bars).
    #[arg(long, global = true)]
    debug: bool,

    /// Do not draw progress bars.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Write the run report as JSON to this file.
    #[arg(long, global = true)]
    report_json: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Extract products into a single products_nutrition table.
    Convert {
        /// Source SQLite dump.
        #[arg(long, default_value = DEFAULT_DUMP)]
        input: PathBuf,
        /// Output PostgreSQL script.
        #[arg(long, default_value = pipeline::nutrition::DEFAULT_OUTPUT)]
        output: PathBuf,
        /// JSON object mapping category ids to names, e.g. {"1": "Bakery"}.
        #[arg(long)]
        categories: Option<PathBuf>,
    },
    /// Rewrite the dump into categories + products tables.
    Fix {
        /// Source SQLite dump.
        #[arg(long, default_value = DEFAULT_DUMP)]
        input: PathBuf,
        /// Output PostgreSQL script.
        #[arg(long, default_value = pipeline::normalized::DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Build the products_nutrition script from a JSON product list.
    FromJson {
        /// JSON array of products.
        #[arg(long, default_value = pipeline::json_import::DEFAULT_INPUT)]
        input: PathBuf,
        /// Output PostgreSQL script.
        #[arg(long, default_value = pipeline::json_import::DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Build the products_nutrition script from a calorie table.
    FromTable {
        /// Calorie table, one product per line under category headings.
        #[arg(long, default_value = pipeline::table_import::DEFAULT_INPUT)]
        input: PathBuf,
        /// Output PostgreSQL script.
        #[arg(long, default_value = pipeline::table_import::DEFAULT_OUTPUT)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if std::env::args().len() == 1 {
        Args::command().print_help()?;
        println!();
        std::process::exit(1);
    }
    let args = Args::parse();

    logger::set_debug(args.debug);
    logger::debug(&format!("main: {:?}", args.command));

    // Progress bars are disabled in debug mode to avoid mangled output.
    let progress = ProgressManager::new(!args.debug && !args.no_progress);
    logger::debug(&format!("main: progress bars enabled: {}", progress.is_enabled()));

    let report = match run(&args.command, &progress) {
        Ok(report) => report,
        Err(e) => {
            logger::error(&e.to_string());
            std::process::exit(1);
        }
    };

    if let Some(path) = args.report_json.as_ref() {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        logger::debug(&format!("main: report written to {}", path.display()));
    }

    print_summary(&report)?;
    Ok(())
}

fn run(command: &Command, progress: &ProgressManager) -> error::Result<RunReport> {
    match command {
        Command::Convert {
            input,
            output,
            categories,
        } => {
            let table = match categories {
                Some(path) => CategoryTable::from_json_file(path)?,
                None => CategoryTable::builtin(),
            };
            if table.is_empty() {
                logger::info("category table is empty, every product falls back to the default name");
            }
            logger::debug(&format!("main: {} categories loaded", table.len()));
            NutritionConverter::new(table).run(input, output, progress)
        }
        Command::Fix { input, output } => NormalizedConverter::new().run(input, output, progress),
        Command::FromJson { input, output } => {
            pipeline::json_import::run(input, output, progress)
        }
        Command::FromTable { input, output } => {
            pipeline::table_import::run(input, output, progress)
        }
    }
}

fn print_summary(report: &RunReport) -> io::Result<()> {
    let sep = "=".repeat(60);
    let mut stderr = io::stderr();
    writeln!(stderr, "\n{}\nSUMMARY ({})\n{}", sep, report.command, sep)?;
    writeln!(stderr, "Input:      {}", report.input)?;
    writeln!(stderr, "Output:     {}", report.output)?;
    writeln!(stderr, "Written:    {}", report.rows_written)?;
    writeln!(stderr, "Skipped:    {}", report.rows_skipped)?;
    if report.rows_drifted > 0 {
        writeln!(stderr, "Drifted:    {}", report.rows_drifted)?;
    }
    writeln!(stderr, "Categories: {}", report.categories)?;
    writeln!(stderr, "Elapsed:    {} ms", report.elapsed_ms)?;
    writeln!(stderr, "{}", sep)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcommands_default_to_fixed_filenames() {
        let args = Args::try_parse_from(["bazaconv", "convert"]).unwrap();
        match args.command {
            Command::Convert {
                input,
                output,
                categories,
            } => {
                assert_eq!(input, PathBuf::from("baza.sql"));
                assert_eq!(output, PathBuf::from("products_for_supabase.sql"));
                assert!(categories.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::try_parse_from(["bazaconv", "fix", "--debug"]).unwrap();
        assert!(args.debug);
        match args.command {
            Command::Fix { input, output } => {
                assert_eq!(input, PathBuf::from("baza.sql"));
                assert_eq!(output, PathBuf::from("products_supabase.sql"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn from_json_accepts_overrides() {
        let args = Args::try_parse_from([
            "bazaconv",
            "--report-json",
            "report.json",
            "from-json",
            "--input",
            "p.json",
            "--output",
            "p.sql",
        ])
        .unwrap();
        assert_eq!(args.report_json, Some(PathBuf::from("report.json")));
        assert!(matches!(args.command, Command::FromJson { .. }));
    }

    #[test]
    fn from_table_reads_the_calorie_table_by_default() {
        let args = Args::try_parse_from(["bazaconv", "from-table"]).unwrap();
        match args.command {
            Command::FromTable { input, output } => {
                assert_eq!(input, PathBuf::from("tablica_caloriynosti.md"));
                assert_eq!(output, PathBuf::from("products_from_table.sql"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn run_dispatches_from_table() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("table.md");
        let output = dir.path().join("out.sql");
        std::fs::write(&input, "Грибы\nБелые сушеные 27,6 6,8 10 286\n").unwrap();

        let report = run(
            &Command::FromTable {
                input,
                output: output.clone(),
            },
            &ProgressManager::new(false),
        )
        .unwrap();
        assert_eq!(report.rows_written, 1);
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("('Белые сушеные', 'белые сушеные', 'Грибы', 27.6, 6.8, 10.0, 286);"));
    }

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn run_dispatches_convert_with_category_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("baza.sql");
        let output = dir.path().join("out.sql");
        let categories = dir.path().join("categories.json");
        std::fs::write(
            &input,
            "INSERT INTO products (name, category_id, proteins, fats, carbohydrates, calories) VALUES ('Хлеб', 1, 7.5, 1.2, NULL, 250);\n",
        )
        .unwrap();
        std::fs::write(&categories, r#"{"1": "Bakery"}"#).unwrap();

        let report = run(
            &Command::Convert {
                input,
                output: output.clone(),
                categories: Some(categories),
            },
            &ProgressManager::new(false),
        )
        .unwrap();
        assert_eq!(report.rows_written, 1);
        assert_eq!(report.categories, 1);
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("('Хлеб', 'хлеб', 'Bakery', 7.5, 1.2, 0.0, 250);"));
    }
}
