pub mod segment_client;
