//! Aggregate loading policy through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use doorbox::{LoadProgress, LoadingManager};

#[test]
fn batch_with_failures_still_completes_exactly_once() {
    let events = Rc::new(RefCell::new(Vec::new()));

    let e = events.clone();
    let manager = LoadingManager::new().on_start(move || e.borrow_mut().push("start".to_owned()));
    let e = events.clone();
    let manager = manager.on_progress(move |name, _| e.borrow_mut().push(format!("ok:{name}")));
    let e = events.clone();
    let manager = manager.on_error(move |name| e.borrow_mut().push(format!("err:{name}")));
    let e = events.clone();
    let mut manager = manager.on_load(move |p: LoadProgress| {
        e.borrow_mut()
            .push(format!("done:{}:{}", p.succeeded, p.failed))
    });

    manager.begin(7);
    for name in ["color", "alpha", "height", "normal", "ao", "metalness"] {
        manager.item_loaded(name);
    }
    assert!(!manager.is_complete());

    manager.item_failed("roughness");
    assert!(manager.is_complete());

    let events = events.borrow();
    assert_eq!(events.first().map(String::as_str), Some("start"));
    assert_eq!(events.last().map(String::as_str), Some("done:6:1"));
    assert_eq!(events.iter().filter(|e| e.starts_with("done")).count(), 1);
    assert_eq!(events.iter().filter(|e| e.starts_with("err")).count(), 1);
}

#[test]
fn progress_counts_pending_items() {
    let mut manager = LoadingManager::new();
    manager.begin(3);
    assert_eq!(
        manager.progress(),
        LoadProgress {
            pending: 3,
            succeeded: 0,
            failed: 0,
        }
    );

    manager.item_loaded("color");
    let progress = manager.progress();
    assert_eq!(progress.pending, 2);
    assert_eq!(progress.total(), 3);
}

#[test]
fn empty_manager_never_reports_completion() {
    let manager = LoadingManager::new();
    assert!(!manager.is_complete());
    assert_eq!(manager.progress().total(), 0);
}
