pub mod station_reader;
pub mod table_reader;

pub use station_reader::StationReader;
pub use table_reader::{parse_index_date, TableReader};
