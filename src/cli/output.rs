//! Console output helpers honoring the global `--json` and `--quiet` flags,
//! which main sets as environment variables so every module can check them.

use serde::Serialize;

pub fn is_json() -> bool {
    std::env::var("OFFPRINT_JSON").as_deref() == Ok("1")
}

pub fn is_quiet() -> bool {
    std::env::var("OFFPRINT_QUIET").as_deref() == Ok("1")
}

pub fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("  Error: failed to serialize output: {e}"),
    }
}
