mod checker;
mod cli;
mod debounce;
mod interchange;
mod properties;
mod scenarios;
