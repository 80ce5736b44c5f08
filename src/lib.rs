pub mod analysis;
pub mod bench;
pub mod bench_utils;
pub mod error;
pub mod generator;
pub mod oracle;
pub mod size_model;
pub mod txo;
