use std::{env, env::VarError};

/// There's no real CLI for the daemon. Any argument prints the help text. Returns true if it did.
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
    // GM_DATABASE_URL holds credentials and is never printed
    const DISPLAY_ENVS: [&str; 9] = [
        "RUST_LOG",
        "GM_DB_MAX_CONNECTIONS",
        "GM_RUN_MIGRATIONS",
        "GM_ACCRUAL_SYSTEM_ADDRESS",
        "GM_ACCRUAL_RETRIES",
        "GM_ACCRUAL_RETRY_WAIT_MS",
        "GM_ACCRUAL_TIMEOUT_MS",
        "GM_TASK_INTERVAL",
        "GM_RECONCILIATION_WORKERS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
