pub mod es_command_store;
