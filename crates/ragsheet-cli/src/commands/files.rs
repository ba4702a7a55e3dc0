use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Table};
use ragsheet_client::files::format_file_size;
use ragsheet_client::{FileInfo, RagClient};

use crate::cli::FileCommands;
use crate::output::table::{print_table, short_id};
use crate::output::{OutputFormat, json::print_json};

pub async fn run(client: &RagClient, command: FileCommands, format: OutputFormat) -> Result<()> {
    let files = client.files();
    match command {
        FileCommands::List => {
            let listing = files.list().await?;
            if format.is_json() {
                return print_json(&listing);
            }
            if listing.files.is_empty() {
                println!("No files in the knowledge base.");
                return Ok(());
            }
            render_files_table(&listing.files)?;
            println!("{} file(s)", listing.total_count);
            Ok(())
        }
        FileCommands::Upload { path } => {
            let response = files.upload_path(&path).await?;
            if format.is_json() {
                return print_json(&response);
            }
            println!("{} {}", "Uploaded".green(), response.filename);
            if !response.message.is_empty() {
                println!("{}", response.message);
            }
            Ok(())
        }
        FileCommands::Delete { name } => {
            let response = files.delete(&name).await?;
            if format.is_json() {
                return print_json(&response);
            }
            println!("{} {}", "Deleted".green(), response.filename.as_deref().unwrap_or(&name));
            Ok(())
        }
        FileCommands::Rebuild => {
            let response = files.rebuild_index().await?;
            if format.is_json() {
                return print_json(&response);
            }
            let message = if response.message.is_empty() {
                "Vector store rebuild started"
            } else {
                response.message.as_str()
            };
            println!("{message}");
            Ok(())
        }
    }
}

fn render_files_table(files: &[FileInfo]) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Name", "Size", "Modified", "Hash"]);

    for file in files {
        table.add_row(vec![
            Cell::new(file.filename.clone()),
            Cell::new(format_file_size(file.size)),
            Cell::new(file.modified_time.clone()),
            Cell::new(short_id(&file.file_hash, 8)),
        ]);
    }

    print_table(table)
}
