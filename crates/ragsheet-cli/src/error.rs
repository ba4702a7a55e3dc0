use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let msg = err.to_string().to_lowercase();

    if msg.contains("connection refused")
        || msg.contains("request failed")
        || msg.contains("health check failed")
        || msg.contains("system offline")
    {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Make sure the server is running, or point at another one with:");
        eprintln!(
            "  {} ragsheet --base-url http://host:8000 <command>",
            "$".dimmed()
        );
    }

    if msg.contains("knowledge base not ready") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Upload a spreadsheet first:");
        eprintln!("  {} ragsheet files upload <path.xlsx>", "$".dimmed());
    }

    if msg.contains("only spreadsheet files") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Save the file as .xlsx or .xls and try again.");
    }

    std::process::exit(1);
}
