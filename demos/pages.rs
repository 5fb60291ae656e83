//! Routed pages demo: a layout shell, a markdown page, and a form page.
//!
//! Run with: cargo run --example pages

use std::rc::Rc;

use vapor_ui::form::{form, FieldSpec, FormSpec, FormState};
use vapor_ui::markdown::markdown;
use vapor_ui::prelude::*;
use vapor_ui::{paper, register_theme, RecordingHost, ThemeToken};

const GUIDE: &str = "\
# Vapor

A compiled UI engine.

- builder API
- arena memory
- command-set reconciliation

```rust
text(\"hello\").end();
```
";

fn main() -> Result<(), vapor_ui::EngineError> {
    init(EngineConfig::default())?;
    register_theme(paper(), true);

    // Shell layout shared by every page under "/".
    register_layout(
        "/",
        |inner| {
            container().gap(12u16).padding(16u16).children(|| {
                container().gap(8u16).children(|| {
                    text("vapor demo").font_size(18u16).fg(ThemeToken::Primary).end();
                });
                inner();
            });
        },
        false,
    );

    register_page("/guide", || markdown(GUIDE), None);

    let spec = Rc::new(FormSpec::new(vec![
        FieldSpec::text("name", "Name").required(),
        FieldSpec::number("age", "Age").range(Some(0), Some(120)),
    ]));
    let state = FormState::new(&spec);
    register_page(
        "/signup",
        move || {
            form(
                &spec,
                &state,
                Rc::new(|data| println!("submitted: {data:?}")),
            );
        },
        Some(Box::new(|| println!("leaving /signup"))),
    );

    let host = RecordingHost::new();
    navigate("/guide");
    let handle = mount(Box::new(host.clone()))?;
    println!("guide page: {} commands", host.len());

    host.clear();
    navigate("/signup");
    println!("route change to /signup: {} commands", host.len());
    println!("current path: {:?}", vapor_ui::current_path());

    handle.unmount();
    teardown();
    Ok(())
}
