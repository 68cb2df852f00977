pub mod sheet_sync;
