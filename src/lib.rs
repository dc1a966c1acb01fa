pub mod db;
pub mod instance_api;
pub mod lifecycle;
pub mod orchestrator;
pub mod paas;
pub mod secrets;
pub mod server;
pub mod services;
pub mod version;
pub mod web;
