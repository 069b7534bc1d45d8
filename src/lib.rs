pub mod api;
pub mod audit;
pub mod catalog;
pub mod complexity;
pub mod config;
pub mod cross_module;
pub mod diagram;
pub mod docs;
pub mod error;
pub mod logger;
pub mod model;
pub mod modules;
pub mod ordering;
pub mod resolve;
pub mod search;
pub mod store;
pub mod testing;
pub mod tools;
pub mod util;
pub mod validation;
