//! Main module for the Reaction Rush application using Yew.
//! Wires the game session to UI components and browser services.

use reaction_rush::{BrowserConfirm, BrowserTimer, LocalStore, Session};
use std::rc::Rc;
use yew::prelude::*;

mod components;

use components::{Panel, Stats};

type BrowserSession = Session<BrowserTimer, LocalStore>;

/// Primary application component: owns one session and re-renders from its
/// snapshot whenever the session signals a change.
#[function_component]
pub fn App() -> Html {
    let session = use_memo((), |_| BrowserSession::new(BrowserTimer, LocalStore));
    let view = use_state(|| session.view());

    // Subscribe once; the observer holds the session weakly to avoid a cycle.
    {
        let session = session.clone();
        let view = view.clone();
        use_effect_with((), move |_| {
            let reader = Rc::downgrade(&session);
            session.set_observer(move |_signal| {
                if let Some(session) = reader.upgrade() {
                    view.set(session.view());
                }
            });
            || ()
        });
    }

    let on_start = {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| {
            session.start();
        })
    };

    let on_panel = {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| {
            session.panel_click();
        })
    };

    let on_reset = {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| {
            session.reset(&BrowserConfirm);
        })
    };

    html! {
        <section id="game" class="game">
            <Panel mode={view.panel} onclick={on_panel} />
            <div class="controls">
                <button id="startBtn" class="btn-primary" onclick={on_start}>{ "Start" }</button>
                <button id="resetBtn" class="btn-secondary" onclick={on_reset}>{ "Reset" }</button>
            </div>
            <p class="feedback">{ view.panel.feedback() }</p>
            <Stats view={(*view).clone()} />
        </section>
    }
}

/// Entry point: installs diagnostics and renders the App.
fn main() {
    // Set the panic hook to log detailed errors to the console
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    yew::Renderer::<App>::new().render();
}
