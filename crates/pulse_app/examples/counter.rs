//! Counter Demo
//!
//! Renders a counter with undo/redo into an in-memory document and prints
//! the markup after every step.
//!
//! Run with:
//! `RUST_LOG=debug cargo run -p pulse_app --example counter`

use pulse_app::prelude::*;

fn main() -> anyhow::Result<()> {
    pulse_app::logging::init();

    let (ctx, document) = AppContext::headless();
    let app = document.borrow_mut().mount_point("app");

    let counter = Component::builder(&ctx, 0i64)
        .name("counter")
        .view(|count: &i64| {
            el("div")
                .class("counter")
                .child(el("button").prop("$onclick", "-1").child("-"))
                .child(el("span").key("value").child(count.to_string()))
                .child(el("button").prop("$onclick", "+1").child("+"))
        })
        .on("+1", |count, _| count + 1)
        .on("-1", |count, _| count - 1)
        .build();
    counter.mount_with(app, MountOptions::new().history(true))?;

    let print = |step: &str| println!("{step:>8}: {}", document.borrow().inner_html(app));
    print("mount");

    for event in ["+1", "+1", "+1", "-1"] {
        counter.run(event, &[])?;
        print(event);
    }

    counter.run("history-prev", &[])?;
    print("undo");
    counter.run("history-prev", &[])?;
    print("undo");
    counter.run("history-next", &[])?;
    print("redo");

    println!("state: {}, history: {:?}", counter.state(), counter.history().entries());
    ctx.teardown();
    Ok(())
}
