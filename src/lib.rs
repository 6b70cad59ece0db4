pub mod commands;
pub mod config;
pub mod staging;
pub mod task;
pub mod upload;
pub mod workflow;
pub mod ytdlp;
