use std::io::{BufRead, Write};
use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::{RekapError, Result};
use crate::models::TransactionType;
use crate::session::{ImportState, ImportSummary, Importer, Staged};
use crate::settings::load_settings;
use crate::sheet::format_number;
use crate::store::{SqliteStore, Store};

const PREVIEW_ROWS: usize = 20;

pub fn run(file: &str, yes: bool) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let store = SqliteStore::new(&conn);

    let (file_name, bytes) = read_source(file)?;
    let mut importer = Importer::new(&store, settings.user_id, settings.color_strategy());
    importer.select_file(&file_name, &bytes);
    drive(&mut importer, yes, &mut std::io::stdin().lock())
}

/// File name for display plus the raw bytes.
pub(crate) fn read_source(path: &str) -> Result<(String, Vec<u8>)> {
    let bytes = std::fs::read(path)?;
    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    Ok((file_name, bytes))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    Back,
}

/// Run a staged session to completion: preview, ask, commit, and offer a
/// retry when the commit fails. Answering `b` drops the preview and asks for
/// another file.
pub(crate) fn drive<S: Store + ?Sized, R: BufRead>(
    importer: &mut Importer<'_, S>,
    yes: bool,
    input: &mut R,
) -> Result<()> {
    loop {
        match importer.state() {
            ImportState::Upload { error: Some(error) } => {
                return Err(RekapError::Other(error.clone()));
            }
            ImportState::Upload { error: None } => {
                let path = ask("File to import (blank to stop):", input)?;
                if path.is_empty() {
                    println!("Nothing imported.");
                    return Ok(());
                }
                let (file_name, bytes) = read_source(&path)?;
                importer.select_file(&file_name, &bytes);
            }
            ImportState::Done(summary) => {
                print_summary(summary);
                return Ok(());
            }
            ImportState::Importing(_) => {
                return Err(RekapError::Other("import already in progress".into()));
            }
            ImportState::Preview(staged) => {
                print_preview(staged);
                let retrying = staged.last_error.is_some();
                if !yes {
                    let question = if retrying { "Retry import?" } else { "Import these transactions?" };
                    match parse_answer(&ask(&format!("{question} [y/N/b]"), input)?) {
                        Answer::Yes => {}
                        Answer::No => {
                            importer.close();
                            println!("Import cancelled.");
                            return Ok(());
                        }
                        Answer::Back => {
                            importer.back();
                            continue;
                        }
                    }
                }
                if let Some(Err(e)) = importer.confirm() {
                    if yes {
                        return Err(e);
                    }
                }
            }
        }
    }
}

fn print_preview(staged: &Staged) {
    println!("{} ({} rows)", staged.file_name.bold(), staged.rows.len());
    println!("{}", preview_table(staged));
    if staged.rows.len() > PREVIEW_ROWS {
        println!("... and {} more", staged.rows.len() - PREVIEW_ROWS);
    }

    if !staged.warnings.is_empty() {
        println!("{}", format!("{} rows skipped:", staged.warnings.len()).yellow().bold());
        for warning in &staged.warnings {
            println!("  {}", warning.yellow());
        }
    }
    if !staged.new_categories.is_empty() {
        println!("Will be created: {}", staged.new_categories.join(", ").cyan());
    }
    if let Some(error) = &staged.last_error {
        println!("{} {error}", "Import failed:".red().bold());
    }
}

fn preview_table(staged: &Staged) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Category", "Description", "Amount", "Type"]);
    for row in staged.rows.iter().take(PREVIEW_ROWS) {
        let amount = format_number(row.amount);
        let amount = match row.kind {
            TransactionType::Income => amount.green().to_string(),
            TransactionType::Expense => amount.red().to_string(),
        };
        table.add_row(vec![
            Cell::new(row.date.format("%d/%m/%Y")),
            Cell::new(&row.category_name),
            Cell::new(&row.description),
            Cell::new(amount),
            Cell::new(row.kind.label()),
        ]);
    }
    table
}

fn print_summary(summary: &ImportSummary) {
    println!(
        "{} {} transactions imported",
        "Done.".green().bold(),
        summary.transactions_imported
    );
    if !summary.categories_created.is_empty() {
        println!("New categories: {}", summary.categories_created.join(", "));
    }
}

fn ask<R: BufRead>(question: &str, input: &mut R) -> Result<String> {
    print!("{question} ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

fn parse_answer(answer: &str) -> Answer {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Answer::Yes,
        "b" | "back" => Answer::Back,
        _ => Answer::No,
    }
}
