//! Counter demo: one page, a text node, and a button that increments.
//!
//! Uses the recording host as the display surface and prints the command
//! stream, so the reconciler's output is visible per event.
//!
//! Run with: cargo run --example counter

use std::cell::Cell;
use std::rc::Rc;

use vapor_ui::prelude::*;
use vapor_ui::{bound_ref, ArenaKind, RecordingHost, ThemeToken};

fn main() -> Result<(), vapor_ui::EngineError> {
    init(EngineConfig::default())?;

    let count = Rc::new(Cell::new(0i32));
    let increment_button = bound_ref(ArenaKind::Persist)?;

    let count_render = count.clone();
    let button_render = increment_button.clone();
    register_page(
        "/",
        move || {
            let count = count_render.clone();
            let bound = button_render.clone();
            container().gap(8u16).padding(16u16).children(move || {
                text(format!("count: {}", count.get()))
                    .font_size(24u16)
                    .fg(ThemeToken::Text)
                    .end();
                let count = count.clone();
                button("+1")
                    .bind(&bound)
                    .bg(ThemeToken::Primary)
                    .on_press(move |_| count.set(count.get() + 1))
                    .end();
            });
        },
        None,
    );
    navigate("/");

    let host = RecordingHost::new();
    let handle = mount(Box::new(host.clone()))?;

    println!("-- initial mount --");
    for op in host.ops() {
        println!("{op:?}");
    }

    // Simulate three presses from the event source.
    for press in 1..=3 {
        host.clear();
        dispatch_event(EngineEvent::Node {
            node: increment_button.get().expect("button bound at mount"),
            kind: EventKind::Press,
            payload: EventPayload::Empty,
        });
        println!("-- after press {press} --");
        for op in host.ops() {
            println!("{op:?}");
        }
    }

    handle.unmount();
    teardown();
    Ok(())
}
