// =============================================================================
// PNODE RADAR — dashboard.rs
// Terminal view of a snapshot, used by `snapshot` and `watch`
//
// Panels:
//   header       — feed state, last refresh, counters
//   NETWORK      — totals and storage utilization
//   LEADERBOARD  — top nodes by credits with risk
//   REGIONS      — node share per region
//   SEEDS        — per-seed outcome of the last cycle
// =============================================================================

use crate::metrics::NodeStatus;
use crate::stats::{format_bytes, leaderboard, region_breakdown};
use crate::store::{FeedState, Snapshot};

pub const DASH_WIDTH: usize = 78;
pub const BAR_WIDTH: usize = 20;
pub const LEADERBOARD_ROWS: usize = 10;

// -----------------------------------------------------------------------------
// ANSI colors
// -----------------------------------------------------------------------------

pub struct Color;
impl Color {
    pub const RED:     &'static str = "\x1b[31m";
    pub const GREEN:   &'static str = "\x1b[32m";
    pub const YELLOW:  &'static str = "\x1b[33m";
    pub const BLUE:    &'static str = "\x1b[34m";
    pub const MAGENTA: &'static str = "\x1b[35m";
    pub const CYAN:    &'static str = "\x1b[36m";
    pub const WHITE:   &'static str = "\x1b[37m";
    pub const BOLD:    &'static str = "\x1b[1m";
    pub const DIM:     &'static str = "\x1b[2m";
    pub const RESET:   &'static str = "\x1b[0m";
}

// -----------------------------------------------------------------------------
// Drawing helpers
// -----------------------------------------------------------------------------

pub fn bar(value: f64, max: f64, width: usize, color: &str) -> String {
    let filled = ((value / max.max(0.001)) * width as f64) as usize;
    let filled = filled.min(width);
    let empty  = width - filled;
    format!("{}{}{}{}{}",
        color,
        "█".repeat(filled),
        Color::DIM,
        "░".repeat(empty),
        Color::RESET)
}

pub fn hline(width: usize) -> String {
    format!("{}{}{}",
        Color::DIM, "─".repeat(width), Color::RESET)
}

pub fn panel_header(title: &str, color: &str) -> String {
    format!("{}┌─ {}{}{} {}{}",
        Color::DIM, color, Color::BOLD, title, Color::RESET,
        format!("{}{}{}", Color::DIM,
            "─".repeat(DASH_WIDTH.saturating_sub(title.len() + 5)),
            Color::RESET))
}

fn state_badge(state: FeedState) -> String {
    let color = match state {
        FeedState::Live     => Color::GREEN,
        FeedState::Empty    => Color::YELLOW,
        FeedState::Degraded => Color::RED,
        FeedState::Loading  => Color::DIM,
    };
    format!("{}{}{}{}", color, Color::BOLD, state.as_str().to_uppercase(), Color::RESET)
}

fn risk_color(score: u8) -> &'static str {
    if score >= 70 { Color::RED }
    else if score >= 20 { Color::YELLOW }
    else { Color::GREEN }
}

// -----------------------------------------------------------------------------
// DashboardRenderer
// -----------------------------------------------------------------------------

pub struct DashboardRenderer;

impl DashboardRenderer {

    pub fn render_header(snap: &Snapshot) -> String {
        let refreshed = snap.refreshed_at
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        format!(
            "{bold}{blue}╔{line}╗{reset}\n\
            {blue}║{reset}  {bold}{white}◉ pNODE RADAR{reset}  [{state}]  \
              {dim}refreshed {refreshed}{reset}\n\
            {blue}╚{line}╝{reset}\n",
            bold=Color::BOLD, blue=Color::BLUE, reset=Color::RESET,
            white=Color::WHITE, dim=Color::DIM,
            line="═".repeat(DASH_WIDTH-2),
            state=state_badge(snap.state),
            refreshed=refreshed,
        )
    }

    pub fn render_network(snap: &Snapshot) -> String {
        let s = &snap.stats;
        let mut out = format!("{}\n", panel_header("NETWORK", Color::CYAN));
        out += &format!("  Nodes  {bold}{:>6}{reset}   Online  {green}{:>6}{reset}   Offline  {red}{:>6}{reset}\n",
            s.total_nodes, s.online_count, s.offline_count,
            bold=Color::BOLD, green=Color::GREEN, red=Color::RED, reset=Color::RESET);
        out += &format!("  Storage {} {:>5.1}%  {dim}{} / {}{reset}\n",
            bar(s.total_storage_used as f64, s.total_storage_capacity as f64, BAR_WIDTH, Color::CYAN),
            s.utilization_pct,
            format_bytes(s.total_storage_used), format_bytes(s.total_storage_capacity),
            dim=Color::DIM, reset=Color::RESET);
        if let Some(err) = &snap.last_error {
            out += &format!("  {}⚠ {}{}\n", Color::RED, err, Color::RESET);
        }
        if snap.is_stale() && !snap.records.is_empty() {
            out += &format!("  {}showing last-known data{}\n", Color::DIM, Color::RESET);
        }
        out
    }

    pub fn render_leaderboard(snap: &Snapshot) -> String {
        let mut out = format!("{}\n", panel_header("LEADERBOARD", Color::YELLOW));
        out += &format!("  {dim}{:>4}  {:12}  {:>12}  {:22}  {:>8}  {:>4}{reset}\n",
            "#", "Node", "Credits", "Region", "Version", "Risk",
            dim=Color::DIM, reset=Color::RESET);
        out += &format!("  {}\n", hline(DASH_WIDTH - 2));

        let top = leaderboard(&snap.records, LEADERBOARD_ROWS);
        for n in &top {
            let dot = match n.status {
                NodeStatus::Online  => format!("{}●{}", Color::GREEN, Color::RESET),
                NodeStatus::Offline => format!("{}●{}", Color::RED, Color::RESET),
            };
            let region: String = n.region.chars().take(22).collect();
            out += &format!("  {:>4}  {} {}{:10}{}  {:>12.0}  {:22}  {:>8}  {}{:>4}{}\n",
                n.rank, dot, Color::BOLD, n.short_pubkey(), Color::RESET,
                n.credits, region, n.version,
                risk_color(n.risk_score), n.risk_score, Color::RESET);
        }
        out
    }

    pub fn render_regions(snap: &Snapshot) -> String {
        let mut out = format!("{}\n", panel_header("REGIONS", Color::MAGENTA));
        let total = snap.records.len().max(1) as f64;
        for r in region_breakdown(&snap.records) {
            out += &format!("  {:22}  {}  {:>5}  {}{:>5} online{}  {:>5.1}%\n",
                r.name.chars().take(22).collect::<String>(),
                bar(r.count as f64, total, BAR_WIDTH, Color::MAGENTA),
                r.count, Color::GREEN, r.online, Color::RESET, r.percentage);
        }
        out
    }

    pub fn render_seeds(snap: &Snapshot) -> String {
        let mut out = format!("{}\n", panel_header("SEEDS", Color::BLUE));
        for s in &snap.seeds {
            if s.ok {
                out += &format!("  {}✓{} {:24} {:>5} pods  {:>6}ms\n",
                    Color::GREEN, Color::RESET, s.seed, s.observations, s.latency_ms);
            } else {
                out += &format!("  {}✗{} {:24} {}{}{}\n",
                    Color::RED, Color::RESET, s.seed,
                    Color::DIM, s.error.as_deref().unwrap_or("failed"), Color::RESET);
            }
        }
        out
    }

    pub fn render_full(snap: &Snapshot) -> String {
        let mut out = String::new();
        out += &Self::render_header(snap);
        out += &Self::render_network(snap);
        out += "\n";
        out += &Self::render_leaderboard(snap);
        out += "\n";
        out += &Self::render_regions(snap);
        out += "\n";
        out += &Self::render_seeds(snap);
        out
    }
}
