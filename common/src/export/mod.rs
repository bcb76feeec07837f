//! 出力用の共通処理（表の構築とCSV書き出し）

pub mod csv_core;

pub use csv_core::{
    build_table, cell_text, dedupe_donations, write_csv, write_row, DonationTable, ExportRules,
    TableStats, ANONYMOUS_LABEL, DEFAULT_EXCLUDED_COLUMNS, UTF8_BOM,
};
