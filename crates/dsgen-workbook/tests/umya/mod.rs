// Integration tests for the umya backend; run with `--features umya`.
mod common;
mod fork;
mod layout;
