pub mod deferred_file_writer;
pub mod writer_stats;
