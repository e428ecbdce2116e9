pub mod api;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod identity;
pub mod lifecycle;
pub mod logging;
pub mod notify;
pub mod policy;
pub mod service;
