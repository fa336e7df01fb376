use axum::extract::State;
use axum::response::Json;

use crate::dto::{ApiResponse, CommandRequest, ProcessInfo};
use crate::state::AppState;

pub async fn process_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    let registry = state.engine.processes();
    let response = match req.command.as_str() {
        "list" => {
            let processes: Vec<ProcessInfo> = registry
                .names()
                .into_iter()
                .filter_map(|name| registry.get(&name))
                .map(|process| ProcessInfo {
                    name: process.name.clone(),
                    description: process.description.clone(),
                    states: process.state_names().into_iter().map(str::to_string).collect(),
                })
                .collect();
            ApiResponse::ok(format!("{} processes", processes.len())).with_processes(processes)
        }
        "graph" => match req.process.as_deref().and_then(|name| registry.get(name)) {
            Some(process) => {
                ApiResponse::ok(format!("process {}", process.name)).with_graph(process.to_mermaid())
            }
            None => ApiResponse {
                error: true,
                error_msg: format!(
                    "unknown process '{}'",
                    req.process.as_deref().unwrap_or("")
                ),
                ..ApiResponse::default()
            },
        },
        "check" => {
            let mut bad = Vec::new();
            for name in registry.names() {
                if let Some(process) = registry.get(&name) {
                    if let Err(e) = process.check() {
                        bad.push(format!("{}: {}", name, e));
                    }
                }
            }
            if bad.is_empty() {
                ApiResponse::ok("all processes check out")
            } else {
                ApiResponse {
                    error: true,
                    error_msg: bad.join("; "),
                    ..ApiResponse::default()
                }
            }
        }
        other => ApiResponse::unknown_command("process", other),
    };
    Json(response)
}
