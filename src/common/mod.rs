pub mod buffered_file_writer;
pub mod error;
pub mod file_system;
