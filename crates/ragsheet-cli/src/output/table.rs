use anyhow::Result;
use comfy_table::Table;

pub fn print_table(table: Table) -> Result<()> {
    println!("{table}");
    Ok(())
}

/// First `max` characters of a hash or identifier, `-` when empty
pub fn short_id(value: &str, max: usize) -> String {
    if value.is_empty() {
        return "-".to_string();
    }
    value.chars().take(max).collect()
}
