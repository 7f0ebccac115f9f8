pub mod csv_export;
pub mod load_summary;
