//! Pure Yew view components for the Reaction Rush UI.
//!
//! Everything here renders from props or a [`SessionView`] snapshot and holds
//! no state of its own.

use reaction_rush::{HistoryEntry, PanelMode, SessionView};
use yew::prelude::*;

/// Placeholder shown when there is no time to display.
const NO_TIME: &str = "—";

/// Format a millisecond value as a whole number, or a dash when absent.
pub fn format_ms(ms: Option<f64>) -> String {
    match ms {
        Some(ms) => format!("{:.0}", ms),
        None => NO_TIME.to_string(),
    }
}

/// The clickable panel, coloured by game phase.
#[derive(Properties, PartialEq)]
pub struct PanelProps {
    pub mode: PanelMode,
    pub onclick: Callback<MouseEvent>,
}

#[function_component(Panel)]
pub fn panel(props: &PanelProps) -> Html {
    html! {
        <div
            id="gamePanel"
            class={classes!("game-panel", props.mode.css_class())}
            style={format!("background-color: {};", props.mode.color())}
            onclick={props.onclick.clone()}
        >
            <p class="panel-message">{ props.mode.message() }</p>
        </div>
    }
}

/// Current, best and rating.
#[derive(Properties, PartialEq)]
pub struct StatsProps {
    pub view: SessionView,
}

#[function_component(Stats)]
pub fn stats(props: &StatsProps) -> Html {
    let view = &props.view;
    let (label, rating) = match view.band {
        Some(band) => (band.label(), band.to_string()),
        None => ("No data yet. Play a round!", "none".to_string()),
    };

    html! {
        <div class="stats">
            <div class="stat">
                <span class="stat-title">{ "Current (ms)" }</span>
                <span class="stat-value">{ format_ms(view.last_elapsed_ms) }</span>
            </div>
            <div class="stat">
                <span class="stat-title">{ "Best (ms)" }</span>
                <span class="stat-value">{ format_ms(view.best_time_ms) }</span>
                <span class={classes!("stat-label", rating)}>{ label }</span>
            </div>
            { render_history(&view.recent) }
        </div>
    }
}

/// Renders the recent-attempts list, newest first.
pub fn render_history(entries: &[HistoryEntry]) -> Html {
    // Early return for empty history
    if entries.is_empty() {
        return html! {
            <ul class="history-list">
                <li>{ "No attempts yet." }</li>
            </ul>
        };
    }

    html! {
        <ul class="history-list">
            { entries.iter().map(|entry| html! {
                <li>
                    <span>{ format!("#{}", entry.sequence) }</span>
                    <span>{ format!("{} ms", format_ms(Some(entry.attempt.elapsed_ms()))) }</span>
                </li>
            }).collect::<Html>() }
        </ul>
    }
}
