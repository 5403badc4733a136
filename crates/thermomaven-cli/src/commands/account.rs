//! Account profile display.

use thermomaven_core::Coordinator;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let Some(info) = coordinator.user_info().await else {
        eprintln!("No account profile available.");
        return Ok(());
    };

    if global.json {
        return output::print_json(&info);
    }

    // Show the interesting fields first, then the rest alphabetically.
    for key in ["nickname", "email", "userId", "region"] {
        if let Some(value) = info.get(key) {
            println!("{key}: {}", display_value(value));
        }
    }
    let mut rest: Vec<_> = info
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "nickname" | "email" | "userId" | "region"))
        .collect();
    rest.sort_by_key(|(k, _)| k.clone());
    for (key, value) in rest {
        println!("{key}: {}", display_value(value));
    }
    Ok(())
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
