pub mod command_store;
