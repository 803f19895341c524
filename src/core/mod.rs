pub mod config;
pub mod file_writer_manager;
