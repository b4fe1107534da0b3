// Library exports for qrshare
// Integration tests drive the router and the share flow through these modules

pub mod auth;
pub mod campaigns;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod extractors;
pub mod images;
pub mod routes;
pub mod scan;
pub mod share;
pub mod state;
