mod command_run;
mod config_errors;
