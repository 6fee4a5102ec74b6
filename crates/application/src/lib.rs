#![forbid(unsafe_code)]

pub mod command_service;
pub mod queryset;
