use std::{env, env::VarError};

/// The host has no real CLI, so any argument prints the help text and exits.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so that secrets never end up on the console
    const DISPLAY_ENVS: [&str; 9] = [
        "RUST_LOG",
        "RENTAL_DB_MAX_CONNECTIONS",
        "RENTAL_RUN_SWEEPER",
        "RENTAL_SWEEP_INTERVAL_SECS",
        "RENTAL_INVOICE_EXPIRY_HOURS",
        "RENTAL_TOPUP_EXPIRY_SECS",
        "RENTAL_EVENT_BUFFER_SIZE",
        "RENTAL_DATABASE_URL",
        "XENDIT_API_URL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) if name == "RENTAL_DATABASE_URL" => rental_common::helpers::redact_url_credentials(&s),
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
