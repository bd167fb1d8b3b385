use asset_sweep_lib::{Config, Result, SchemaIndex};
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;

pub fn handle_schema_command(config: &Config) -> Result<()> {
    let store = super::open_store(config)?;
    let index = SchemaIndex::build(&store)?;

    if index.tables().is_empty() {
        println!("{}", style("Database has no tables").yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Table").fg(Color::Cyan),
        Cell::new("Column").fg(Color::Cyan),
        Cell::new("Declared type").fg(Color::Cyan),
        Cell::new("Match").fg(Color::Cyan),
    ]);

    for entry in index.tables() {
        if entry.columns.is_empty() {
            table.add_row(vec![
                Cell::new(&entry.table),
                Cell::new("(no text columns)").fg(Color::DarkGrey),
                Cell::new(""),
                Cell::new("skipped").fg(Color::DarkGrey),
            ]);
            continue;
        }
        for column in &entry.columns {
            table.add_row(vec![
                Cell::new(&entry.table),
                Cell::new(&column.column),
                Cell::new(&column.declared_type),
                Cell::new(column.match_kind.as_str()),
            ]);
        }
    }

    println!("{}", table);
    println!(
        "\n{} tables, {} eligible columns",
        index.tables().len(),
        index.eligible_column_count()
    );

    Ok(())
}
