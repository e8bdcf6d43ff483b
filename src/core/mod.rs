pub mod audit;
pub mod config;
pub mod filters;
pub mod generator;
pub mod select;
pub mod tags;
pub mod template;
