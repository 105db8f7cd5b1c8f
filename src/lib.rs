pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod domain;
pub mod infrastructure;
pub mod ml;
pub mod text;
pub mod training;
