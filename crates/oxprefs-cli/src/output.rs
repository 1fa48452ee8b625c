use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

/// Table with the CLI's standard look.
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}
