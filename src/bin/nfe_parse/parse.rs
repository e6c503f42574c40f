use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use rust_xlsxwriter::{ColNum, Format, FormatBorder, RowNum, Workbook};
use walkdir::WalkDir;

use nfe_tools::nfe::{OutputTable, assemble_with_progress};

use crate::config::Config;

/// Parse NFe files and write the installment rows to Excel.
pub fn nfe_parse(config: &Config) -> Result<()> {
    let (root, files) = get_xml_file_list(&config.input_path, config.recurse)?;
    if files.is_empty() {
        anyhow::bail!("No XML files to parse".red());
    }

    let table = parse_files(&root, &files, config.verbose)?;
    if table.is_empty() {
        nfe_tools::print_warning!("No installments found in {} files", files.len());
    }

    if config.print {
        print_table(&table);
    } else {
        write_to_excel(&table, &config.output_file, &config.sheet_name)?;
    }

    println!("{}", "Processing complete".green().bold());
    Ok(())
}

/// Return file root and list of files from the input path that can be either a directory or single file.
fn get_xml_file_list(input: &Path, recurse: bool) -> Result<(PathBuf, Vec<PathBuf>)> {
    if input.is_file() {
        println!("{}", format!("Parsing file: {}", input.display()).bold().magenta());
        if nfe_tools::has_extension(input, "xml") {
            let parent = input.parent().context("Failed to get parent directory")?.to_path_buf();
            Ok((parent, vec![input.to_path_buf()]))
        } else {
            Err(anyhow!("Input path is not an XML file: {}", input.display()))
        }
    } else {
        println!(
            "{}",
            format!("Parsing files from: {}", input.display()).bold().magenta()
        );
        Ok((input.to_path_buf(), get_xml_files(input, recurse)?))
    }
}

/// Collect XML files from the given directory, sorted by lowercase path.
fn get_xml_files(root: &Path, recurse: bool) -> Result<Vec<PathBuf>> {
    let max_depth = if recurse { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !nfe_tools::is_hidden(e))
    {
        let entry = entry.with_context(|| format!("Failed to read directory: {}", root.display()))?;
        let path = entry.path();
        if path.is_file() && nfe_tools::has_extension(path, "xml") {
            files.push(path.to_path_buf());
        }
    }

    files.sort_by_key(|path| path.to_string_lossy().to_lowercase());
    Ok(files)
}

/// Parse all files into one table, printing the record count for each file.
fn parse_files(root: &Path, files: &[PathBuf], verbose: bool) -> Result<OutputTable> {
    let num_files = files.len();
    let digits = num_files.checked_ilog10().map_or(1, |d| d as usize + 1);
    let mut number = 0;

    let table = assemble_with_progress(files, |file, records| {
        number += 1;
        let name = nfe_tools::get_relative_path_or_filename(file, root);
        let count = if records.is_empty() {
            "0".yellow()
        } else {
            records.len().to_string().cyan()
        };
        println!("{}", format!("{number:>0digits$}: {name} ({count})").bold());
        if verbose {
            for record in records {
                println!("  {record}");
            }
        }
    })?;

    println!(
        "Found {} installments from {}",
        table.len(),
        if num_files > 1 {
            format!("{num_files} files")
        } else {
            "1 file".to_string()
        }
    );

    Ok(table)
}

/// Print the table rows to stdout.
fn print_table(table: &OutputTable) {
    let header: Vec<&str> = table.columns().iter().map(|field| field.label()).collect();
    println!("{}", header.join(" | ").bold());
    for row in table.iter_rows() {
        let cells: Vec<&str> = row.into_iter().map(|cell| cell.unwrap_or("")).collect();
        println!("{}", cells.join(" | "));
    }
}

/// Save the table to an Excel file.
///
/// The workbook is written only after all rows are in place,
/// so a failure earlier in the batch leaves no file behind.
fn write_to_excel(table: &OutputTable, output_file: &Path, sheet_name: &str) -> Result<()> {
    println!(
        "{}",
        format!("Writing data to Excel: {}", output_file.display()).green()
    );
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name(sheet_name)?;
    let header_format = Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_background_color("C6E0B4");

    for (col, field) in table.columns().iter().enumerate() {
        sheet.write_string_with_format(0, col as ColNum, field.label(), &header_format)?;
    }

    for (index, row) in table.iter_rows().enumerate() {
        let row_num = (index + 1) as RowNum;
        for (col, cell) in row.into_iter().enumerate() {
            if let Some(value) = cell {
                sheet.write_string(row_num, col as ColNum, value)?;
            }
        }
    }
    sheet.autofit();

    if output_file.exists()
        && let Err(e) = std::fs::remove_file(output_file)
    {
        nfe_tools::print_error!("Failed to remove existing xlsx file: {e}");
    }
    workbook
        .save(output_file)
        .with_context(|| format!("Failed to write Excel file: {}", output_file.display()))?;
    Ok(())
}
