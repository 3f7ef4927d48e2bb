//! Deferred commits of asynchronous updates
//!
//! Every test runs on a paused clock inside a `LocalSet`, which is where
//! pending updates are resolved.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use pulse_app::prelude::*;
use serde_json::json;
use tokio::task::LocalSet;
use tokio::time::sleep;

/// Component whose `load` event resolves to `args[0]` after `args[1]` ms
fn loader(ctx: &AppContext) -> ComponentBuilder<i64> {
    Component::builder(ctx, 0i64)
        .name("loader")
        .view(|value: &i64| el("output").child(value.to_string()))
        .on("load", |_, args| {
            let value = args.first().and_then(|v| v.as_i64()).unwrap_or_default();
            let delay = args.get(1).and_then(|v| v.as_u64()).unwrap_or_default();
            Update::pending(async move {
                sleep(Duration::from_millis(delay)).await;
                Ok(value)
            })
        })
        .on("fail", |_, _| {
            Update::<i64>::pending(async {
                sleep(Duration::from_millis(5)).await;
                Err(anyhow::anyhow!("backend offline"))
            })
        })
}

#[tokio::test(start_paused = true)]
async fn test_pending_update_commits_on_resolution() {
    LocalSet::new()
        .run_until(async {
            let (ctx, document) = AppContext::headless();
            let app = document.borrow_mut().mount_point("app");
            let component = loader(&ctx).build();
            component.mount(app).unwrap();

            component.run("load", &[json!(7), json!(10)]).unwrap();
            assert_eq!(component.state(), 0, "dispatch returns before resolution");

            sleep(Duration::from_millis(20)).await;
            assert_eq!(component.state(), 7);
            assert_eq!(document.borrow().inner_html(app), "<output>7</output>");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_rejected_update_leaves_state_unchanged() {
    LocalSet::new()
        .run_until(async {
            let (ctx, document) = AppContext::headless();
            let app = document.borrow_mut().mount_point("app");
            let component = loader(&ctx).build();
            component
                .mount_with(app, MountOptions::new().history(true))
                .unwrap();
            component.run("load", &[json!(3), json!(0)]).unwrap();
            sleep(Duration::from_millis(1)).await;
            assert_eq!(component.state(), 3);

            component.run("fail", &[]).unwrap();
            sleep(Duration::from_millis(20)).await;

            assert_eq!(component.state(), 3);
            assert_eq!(component.history().entries(), &[0, 3]);
            assert_eq!(document.borrow().inner_html(app), "<output>3</output>");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_dispatched_rejection_is_broadcast_on_the_shared_bus() {
    LocalSet::new()
        .run_until(async {
            let (ctx, _document) = AppContext::headless();
            let failures = Rc::new(RefCell::new(Vec::new()));
            let sink = failures.clone();
            ctx.bus().subscribe("@update-error", move |args| {
                sink.borrow_mut().extend(args.iter().cloned());
                Ok(())
            });

            let component = loader(&ctx).build();
            component.mount("app").unwrap();
            component.run("fail", &[]).unwrap();
            assert!(failures.borrow().is_empty());

            sleep(Duration::from_millis(10)).await;
            assert_eq!(
                *failures.borrow(),
                vec![json!({"component": "loader", "error": "backend offline"})]
            );
            assert_eq!(component.state(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_rejection_is_returned_through_the_commit_handle() {
    LocalSet::new()
        .run_until(async {
            let (ctx, _document) = AppContext::headless();
            let component = loader(&ctx).build();
            component.mount("app").unwrap();

            let commit = component.set_state(
                Update::<i64>::pending(async { Err(anyhow::anyhow!("timeout")) }),
                CommitOptions::default(),
            );
            let Commit::Deferred(handle) = commit else {
                panic!("pending updates are deferred");
            };

            let err = handle.await.unwrap().unwrap_err();
            assert_eq!(err.to_string(), "timeout");
            assert_eq!(component.state(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_last_resolved_update_wins_by_default() {
    LocalSet::new()
        .run_until(async {
            let (ctx, _document) = AppContext::headless();
            let component = loader(&ctx).build();
            component.mount("app").unwrap();

            // dispatched first, resolves last
            component.run("load", &[json!(1), json!(50)]).unwrap();
            component.run("load", &[json!(2), json!(10)]).unwrap();

            sleep(Duration::from_millis(20)).await;
            assert_eq!(component.state(), 2);
            sleep(Duration::from_millis(50)).await;
            assert_eq!(component.state(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_strict_async_drops_overtaken_updates() {
    LocalSet::new()
        .run_until(async {
            let (ctx, _document) = AppContext::headless();
            let component = loader(&ctx).build();
            component
                .mount_with("app", MountOptions::new().strict_async(true))
                .unwrap();

            component.run("load", &[json!(1), json!(50)]).unwrap();
            component.run("load", &[json!(2), json!(10)]).unwrap();

            sleep(Duration::from_millis(100)).await;
            assert_eq!(component.state(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_pending_update_after_unmount_is_dropped() {
    LocalSet::new()
        .run_until(async {
            let (ctx, _document) = AppContext::headless();
            let component = loader(&ctx).build();
            component.mount("app").unwrap();

            component.run("load", &[json!(9), json!(10)]).unwrap();
            component.unmount();
            sleep(Duration::from_millis(20)).await;

            assert_eq!(component.lifecycle(), Lifecycle::Disposed);
            assert_eq!(component.state(), 0);
        })
        .await;
}
