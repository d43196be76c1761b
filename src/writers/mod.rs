pub mod csv_writer;
pub mod parquet_writer;

pub use csv_writer::TableWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
