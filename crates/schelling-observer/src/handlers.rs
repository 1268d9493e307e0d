//! HTTP endpoint handlers for the board server.
//!
//! Every handler goes through the shared [`Session`](schelling_core::Session);
//! mutations push a fresh snapshot to all viewers before the response is
//! sent.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Board page |
//! | `POST` | `/move` | Move an agent (form: `player`, `target_x`, `target_y`) |
//! | `POST` | `/reset` | Reshuffle every agent |
//! | `POST` | `/scenario/{threshold}` | Set the middle-cell threshold |
//! | `GET` | `/api/snapshot` | Current board snapshot |
//! | `GET` | `/api/agents/{id}` | Happiness breakdown for one agent |
//! | `GET` | `/api/status` | Viewer count, version, uptime |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use axum::{Form, Json};
use chrono::{DateTime, Utc};
use schelling_core::scenario::{CORNER_THRESHOLD, SIDE_THRESHOLD};
use schelling_types::{AgentId, BoardSnapshot, CellClass, HappinessReport, ScenarioPreset};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Form body of `POST /move`.
#[derive(Debug, Deserialize)]
pub struct MoveForm {
    /// Agent identifier, e.g. `P07`.
    pub player: String,
    /// Target row.
    pub target_x: i64,
    /// Target column.
    pub target_y: i64,
}

/// Body of `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Connected viewers.
    pub viewers: usize,
    /// Commit counter of the current board.
    pub version: u64,
    /// Current middle-cell threshold.
    pub middle_threshold: u8,
    /// Agents on the roster.
    pub agents: usize,
    /// Agents currently unhappy.
    pub unhappy: usize,
    /// Cells with no agent.
    pub empty_cells: usize,
    /// When the server state was created.
    pub started_at: DateTime<Utc>,
    /// Seconds since `started_at`.
    pub uptime_seconds: i64,
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Move an agent to a target cell.
///
/// # Errors
///
/// 404 for an unknown agent, 400 for an off-board target, 409 for an
/// occupied target.
pub async fn move_agent(
    State(state): State<Arc<AppState>>,
    Form(form): Form<MoveForm>,
) -> Result<Json<Value>, ObserverError> {
    let agent = AgentId::from(form.player);
    state
        .session
        .move_agent(&agent, form.target_x, form.target_y)
        .await?;
    Ok(Json(json!({ "status": "moved" })))
}

/// Reshuffle the board.
pub async fn reset(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.session.reset().await;
    Json(json!({ "status": "reset" }))
}

/// Set the middle-cell threshold.
///
/// # Errors
///
/// 400 if the threshold is outside `0..=8`.
pub async fn change_scenario(
    State(state): State<Arc<AppState>>,
    Path(threshold): Path<i64>,
) -> Result<Json<Value>, ObserverError> {
    let applied = state.session.set_scenario(threshold).await?;
    Ok(Json(json!({
        "status": "scenario changed",
        "threshold": applied,
    })))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// The current board snapshot, the same shape viewers receive.
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<BoardSnapshot> {
    Json(state.session.snapshot().await)
}

/// Happiness breakdown for one agent.
///
/// # Errors
///
/// 404 if the agent is not on the roster.
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HappinessReport>, ObserverError> {
    let report = state.session.report(&AgentId::from(id)).await?;
    Ok(Json(report))
}

/// Server and session counters.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let status = state.session.status().await;
    Json(StatusResponse {
        viewers: status.viewers,
        version: status.version,
        middle_threshold: status.middle_threshold,
        agents: status.agents,
        unhappy: status.unhappy,
        empty_cells: status.empty_cells,
        started_at: state.started_at,
        uptime_seconds: state.uptime_seconds(),
    })
}

// ---------------------------------------------------------------------------
// GET / -- board page
// ---------------------------------------------------------------------------

const PAGE_STYLE: &str = r"
    body {
        background: #0d1117;
        color: #c9d1d9;
        font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
        padding: 2rem;
        max-width: 800px;
        margin: 0 auto;
    }
    h1 { color: #58a6ff; margin-bottom: 0.25rem; }
    .subtitle { color: #8b949e; margin-top: 0; }
    .rules {
        background: #161b22;
        border: 1px solid #30363d;
        border-radius: 6px;
        padding: 0.5rem 1.5rem;
        font-size: 0.9rem;
    }
    #game-board {
        display: grid;
        grid-template-columns: repeat(5, 64px);
        gap: 4px;
        margin: 1.5rem 0;
    }
    .cell {
        width: 64px;
        height: 64px;
        display: flex;
        align-items: center;
        justify-content: center;
        border: 2px solid #30363d;
        border-radius: 6px;
        cursor: pointer;
        font-weight: bold;
    }
    .cell.empty { background: #161b22; }
    .cell.Blue { background: #1f6feb; color: #ffffff; }
    .cell.Grey { background: #6e7681; color: #ffffff; }
    .cell.unhappy { border-color: #f85149; border-width: 4px; }
    .controls { margin: 1rem 0; }
    label { margin-right: 1rem; }
    input, select, button {
        background: #161b22;
        color: #c9d1d9;
        border: 1px solid #30363d;
        border-radius: 4px;
        padding: 0.25rem 0.5rem;
    }
    input[type=number] { width: 3.5rem; }
    button { cursor: pointer; }
    #message { color: #f85149; min-height: 1.2rem; }
";

const PAGE_SCRIPT: &str = r"
const board = document.getElementById('game-board');
const moveForm = document.getElementById('move-form');
const playerSelect = document.getElementById('player-select');
const scenarioSelect = document.getElementById('scenario-select');
const message = document.getElementById('message');

function renderBoard(snapshot) {
    board.innerHTML = '';
    snapshot.grid.forEach((row, x) => {
        row.forEach((cell, y) => {
            const div = document.createElement('div');
            div.className = 'cell';
            if (cell) {
                div.classList.add(snapshot.agents[cell].tribe);
                if (snapshot.unhappy.includes(cell)) {
                    div.classList.add('unhappy');
                }
                div.textContent = cell;
                div.onclick = () => { playerSelect.value = cell; };
            } else {
                div.classList.add('empty');
                div.onclick = () => {
                    moveForm.elements['target_x'].value = x;
                    moveForm.elements['target_y'].value = y;
                };
            }
            board.appendChild(div);
        });
    });
    const current = String(snapshot.middle_threshold);
    if ([...scenarioSelect.options].some((option) => option.value === current)) {
        scenarioSelect.value = current;
    }
    document.getElementById('version').textContent = snapshot.version;
    document.getElementById('unhappy-count').textContent = snapshot.unhappy.length;
}

async function post(url, body) {
    const response = await fetch(url, { method: 'POST', body });
    if (response.ok) {
        message.textContent = '';
    } else {
        const error = await response.json().catch(() => ({ error: response.statusText }));
        message.textContent = error.error;
    }
}

const RECONNECT_MIN_MS = 1000;
const RECONNECT_MAX_MS = 10000;
let reconnectDelay = RECONNECT_MIN_MS;

function connect() {
    const protocol = location.protocol === 'https:' ? 'wss' : 'ws';
    const socket = new WebSocket(`${protocol}://${location.host}/ws`);
    socket.onopen = () => {
        reconnectDelay = RECONNECT_MIN_MS;
        message.textContent = '';
    };
    socket.onmessage = (event) => renderBoard(JSON.parse(event.data));
    socket.onclose = () => {
        message.textContent = `Disconnected from server. Reconnecting in ${reconnectDelay / 1000}s...`;
        setTimeout(connect, reconnectDelay);
        reconnectDelay = Math.min(reconnectDelay * 2, RECONNECT_MAX_MS);
    };
}

connect();

moveForm.onsubmit = async (event) => {
    event.preventDefault();
    await post('/move', new URLSearchParams(new FormData(moveForm)));
    moveForm.elements['target_x'].value = '';
    moveForm.elements['target_y'].value = '';
};
document.getElementById('reset-button').onclick = () => post('/reset');
scenarioSelect.onchange = () => post(`/scenario/${scenarioSelect.value}`);
";

/// Serve the board page.
///
/// The board itself is drawn client-side from the `WebSocket` stream; the
/// server only fills in the agent picker and the scenario picker.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let roster = state.session.roster().await;
    let threshold = state.session.status().await.middle_threshold;
    let middle_max = CellClass::Middle.max_neighbors();
    let side_max = CellClass::Side.max_neighbors();
    let corner_max = CellClass::Corner.max_neighbors();

    let agent_options: String = roster
        .iter()
        .map(|agent| {
            format!(
                "<option value=\"{id}\">{id} ({tribe})</option>\n",
                id = escape_html(agent.id.as_str()),
                tribe = agent.tribe,
            )
        })
        .collect();

    let mut scenario_options: String = ScenarioPreset::ALL
        .into_iter()
        .map(|preset| {
            let t = preset.middle_threshold();
            let selected = if t == threshold { " selected" } else { "" };
            format!("<option value=\"{t}\"{selected}>{}</option>\n", preset.label())
        })
        .collect();
    if ScenarioPreset::from_threshold(threshold).is_none() {
        scenario_options.push_str(&format!(
            "<option value=\"{threshold}\" selected>Custom ({threshold} out of {middle_max})</option>\n"
        ));
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Schelling Board</title>
    <style>{PAGE_STYLE}</style>
</head>
<body>
    <h1>Schelling Board</h1>
    <p class="subtitle">Version <span id="version">-</span> &middot; <span id="unhappy-count">-</span> unhappy</p>

    <div class="rules">
        <p>Everyone wants some neighbors of their own tribe nearby. A neighbor is any of the up to eight surrounding cells.</p>
        <ul>
            <li>Middle cells: the selected scenario sets how many of {middle_max} neighbors must match.</li>
            <li>Side cells: {SIDE_THRESHOLD} out of {side_max}.</li>
            <li>Corner cells: {CORNER_THRESHOLD} out of {corner_max}.</li>
        </ul>
        <p>Cells with a red border hold unhappy agents. Click an agent, then an empty cell, then Move.</p>
    </div>

    <div class="controls">
        <label for="scenario-select">Scenario:</label>
        <select id="scenario-select">
{scenario_options}        </select>
        <button id="reset-button" type="button">Reset board</button>
    </div>

    <div id="game-board"></div>

    <form id="move-form" class="controls">
        <label>Agent:
            <select name="player" id="player-select">
{agent_options}            </select>
        </label>
        <label>Row: <input type="number" name="target_x" min="0" max="4" required></label>
        <label>Column: <input type="number" name="target_y" min="0" max="4" required></label>
        <button type="submit">Move</button>
    </form>
    <p id="message"></p>

    <script>{PAGE_SCRIPT}</script>
</body>
</html>"#
    ))
}

/// Escape text for use in HTML element content and quoted attribute values.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
