#![forbid(unsafe_code)]

pub mod command;
