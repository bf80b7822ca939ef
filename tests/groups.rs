use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use taskrunner::{
    Completion, Event, EventKind, GroupKind, GroupPolicy, NOT_FOUND, Scheduler, SchedulerConfig,
    TaskBody, TaskError, Target,
};

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn position(events: &[Event], kind: EventKind, task: &str) -> usize {
    events
        .iter()
        .position(|e| e.kind == kind && e.task.as_deref() == Some(task))
        .unwrap_or_else(|| panic!("no {kind:?} for {task}"))
}

fn count(events: &[Event], kind: EventKind, task: &str) -> usize {
    events
        .iter()
        .filter(|e| e.kind == kind && e.task.as_deref() == Some(task))
        .count()
}

/// Future body sleeping `ms` and then bumping `counter`.
fn sleeper(ms: u64, counter: &Arc<AtomicUsize>) -> TaskBody {
    let counter = Arc::clone(counter);
    TaskBody::future(move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }
    })
}

#[tokio::test]
async fn empty_parallel_group_finishes_immediately() {
    let runner = Scheduler::new();
    let mut rx = runner.subscribe();

    let group = runner.parallel(Vec::<Target>::new());
    let inv = runner.run(group).unwrap().expect("started");
    assert_eq!(inv.id(), "parallel");
    assert_eq!(inv.await, Ok(()));

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, EventKind::TaskStarting);
    assert_eq!(events[1].kind, EventKind::TaskFinished);
}

#[tokio::test]
async fn parallel_group_waits_for_every_child() {
    let runner = Scheduler::new();
    let mut rx = runner.subscribe();
    let counter = Arc::new(AtomicUsize::new(0));

    let t1 = {
        let counter = Arc::clone(&counter);
        TaskBody::sync(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    };
    runner.register("t1", t1).unwrap();
    runner.register("t2", sleeper(30, &counter)).unwrap();
    runner.register("t3", sleeper(15, &counter)).unwrap();
    runner
        .register("all", runner.parallel(["t1", "t2", "t3"]))
        .unwrap();

    let (tx, done) = tokio::sync::oneshot::channel();
    let started = {
        let counter = Arc::clone(&counter);
        runner
            .run_with("all", move |res| {
                let _ = tx.send((res, counter.load(Ordering::SeqCst)));
            })
            .unwrap()
    };
    assert!(started);

    let (res, count_at_done) = done.await.unwrap();
    assert_eq!(res, Ok(()));
    assert_eq!(count_at_done, 3);

    let events = drain(&mut rx);
    let finished = position(&events, EventKind::TaskFinished, "all");
    assert_eq!(finished, events.len() - 1);
    assert!(events[finished].elapsed.unwrap() >= Duration::from_millis(30));

    // every child started before the first one finished
    let last_start = ["t1", "t2", "t3"]
        .iter()
        .map(|t| position(&events, EventKind::TaskStarting, t))
        .max()
        .unwrap();
    let first_finish = ["t1", "t2", "t3"]
        .iter()
        .map(|t| position(&events, EventKind::TaskFinished, t))
        .min()
        .unwrap();
    assert!(last_start < first_finish);
}

#[tokio::test]
async fn serial_group_runs_children_in_order() {
    let runner = Scheduler::new();
    let mut rx = runner.subscribe();
    let counter = Arc::new(AtomicUsize::new(0));
    let seen_by_t2 = Arc::new(Mutex::new(None));

    let t1 = {
        let counter = Arc::clone(&counter);
        TaskBody::callback(move |done| {
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                done.ok();
            });
        })
    };
    let t2 = {
        let counter = Arc::clone(&counter);
        let seen = Arc::clone(&seen_by_t2);
        TaskBody::sync(move || {
            *seen.lock().unwrap() = Some(counter.load(Ordering::SeqCst));
        })
    };
    runner.register("t1", t1).unwrap();
    runner.register("t2", t2).unwrap();

    let res = runner
        .run(runner.serial(["t1", "t2"]))
        .unwrap()
        .expect("started")
        .await;
    assert_eq!(res, Ok(()));
    assert_eq!(*seen_by_t2.lock().unwrap(), Some(1));

    let events = drain(&mut rx);
    assert!(
        position(&events, EventKind::TaskFinished, "t1")
            < position(&events, EventKind::TaskStarting, "t2")
    );
}

#[tokio::test]
async fn running_children_are_skipped() {
    let runner = Scheduler::new();
    let mut rx = runner.subscribe();
    let slot: Arc<Mutex<Option<Completion>>> = Arc::new(Mutex::new(None));
    let busy = {
        let slot = Arc::clone(&slot);
        TaskBody::callback(move |done| {
            *slot.lock().unwrap() = Some(done);
        })
    };
    runner.register("busy", busy).unwrap();
    runner.register("next", TaskBody::sync(|| {})).unwrap();

    let held = runner.run("busy").unwrap().expect("started");

    let serial = runner.serial(["busy", "next"]);
    assert_eq!(runner.run(serial).unwrap().unwrap().await, Ok(()));
    let parallel = runner.parallel(["busy", "next"]);
    assert_eq!(runner.run(parallel).unwrap().unwrap().await, Ok(()));

    slot.lock().unwrap().take().expect("parked").ok();
    assert_eq!(held.await, Ok(()));

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::TaskStarting, "busy"), 1);
    assert_eq!(count(&events, EventKind::TaskStarting, "next"), 2);
}

#[tokio::test]
async fn group_cannot_run_itself_twice() {
    let runner = Scheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    runner.register("slow", sleeper(20, &counter)).unwrap();
    let group = runner.register("g", runner.serial(["slow"])).unwrap();

    let first = runner.run("g").unwrap().expect("started");
    assert!(group.is_running());
    assert!(runner.run(&group).unwrap().is_none());

    assert_eq!(first.await, Ok(()));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn best_effort_collects_failures_in_list_order() {
    let runner = Scheduler::new();
    let mut rx = runner.subscribe();
    let counter = Arc::new(AtomicUsize::new(0));

    runner.register("bad1", TaskBody::sync(|| false)).unwrap();
    runner.register("ok", sleeper(5, &counter)).unwrap();
    runner
        .register("bad2", TaskBody::callback(|done| done.fail("broken")))
        .unwrap();

    let res = runner
        .run(runner.parallel(["bad1", "missing", "ok", "bad2"]))
        .unwrap()
        .unwrap()
        .await;
    assert_eq!(
        res,
        Err(TaskError::ChildrenFailed {
            failed: vec!["bad1".into(), "missing".into(), "bad2".into()]
        })
    );
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let events = drain(&mut rx);
    let nf = position(&events, EventKind::TaskNotFound, "missing");
    assert_eq!(events[nf].code, Some(NOT_FOUND));

    let res = runner
        .run(runner.serial(["ok", "bad1", "ok"]))
        .unwrap()
        .unwrap()
        .await;
    assert_eq!(
        res,
        Err(TaskError::ChildrenFailed {
            failed: vec!["bad1".into()]
        })
    );
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn fail_fast_serial_stops_at_first_failure() {
    let runner = Scheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    runner.register("bad", TaskBody::sync(|| false)).unwrap();
    runner.register("after", sleeper(1, &counter)).unwrap();

    let group = runner.group(GroupKind::Serial, GroupPolicy::FailFast, ["bad", "after"]);
    let res = runner.run(group).unwrap().unwrap().await;

    assert!(matches!(res, Err(TaskError::Fail { .. })));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fail_fast_parallel_cancels_siblings() {
    let runner = Scheduler::with_config(SchedulerConfig {
        group_policy: GroupPolicy::FailFast,
        ..SchedulerConfig::default()
    });
    let cancelled = Arc::new(AtomicBool::new(false));
    let waiter = {
        let cancelled = Arc::clone(&cancelled);
        TaskBody::future(move |ctx| {
            let cancelled = Arc::clone(&cancelled);
            async move {
                ctx.cancelled().await;
                cancelled.store(true, Ordering::SeqCst);
            }
        })
    };
    runner.register("waiter", waiter).unwrap();
    runner.register("bad", TaskBody::sync(|| false)).unwrap();

    let res = runner
        .run(runner.parallel(["waiter", "bad"]))
        .unwrap()
        .unwrap()
        .await;

    assert!(matches!(res, Err(TaskError::Fail { .. })));
    assert!(cancelled.load(Ordering::SeqCst));
    assert!(!runner.is_running("waiter"));
}

#[tokio::test]
async fn fail_fast_parallel_with_unknown_child_starts_nothing() {
    let runner = Scheduler::new();
    let mut rx = runner.subscribe();
    let counter = Arc::new(AtomicUsize::new(0));
    runner.register("ok", sleeper(1, &counter)).unwrap();

    let group = runner.group(GroupKind::Parallel, GroupPolicy::FailFast, ["ok", "nope"]);
    let res = runner.run(group).unwrap().unwrap().await;

    assert_eq!(res, Err(TaskError::NotFound { id: "nope".into() }));
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::TaskStarting, "ok"), 0);
    assert_eq!(count(&events, EventKind::TaskNotFound, "nope"), 1);
}

#[tokio::test]
async fn groups_nest_and_mix_ids_with_literals() {
    let runner = Scheduler::new();
    let mut rx = runner.subscribe();
    let counter = Arc::new(AtomicUsize::new(0));
    let seen_by_last = Arc::new(Mutex::new(None));

    runner.register("a", sleeper(10, &counter)).unwrap();
    runner.register("b", sleeper(5, &counter)).unwrap();
    let last = {
        let counter = Arc::clone(&counter);
        let seen = Arc::clone(&seen_by_last);
        TaskBody::sync(move || {
            *seen.lock().unwrap() = Some(counter.load(Ordering::SeqCst));
        })
        .named("last")
    };

    let build = runner.parallel(["a", "b"]).named("build");
    runner
        .register("default", runner.serial([Target::from(build), Target::from(last)]))
        .unwrap();

    let res = runner.start().unwrap().expect("started").await;
    assert_eq!(res, Ok(()));
    assert_eq!(*seen_by_last.lock().unwrap(), Some(2));

    let events = drain(&mut rx);
    assert_eq!(position(&events, EventKind::TaskStarting, "default"), 0);
    assert!(
        position(&events, EventKind::TaskFinished, "build")
            < position(&events, EventKind::TaskStarting, "last")
    );
    assert_eq!(
        position(&events, EventKind::TaskFinished, "default"),
        events.len() - 1
    );
}

#[tokio::test]
async fn group_timeout_cancels_children() {
    let runner = Scheduler::new();
    let mut rx = runner.subscribe();
    let counter = Arc::new(AtomicUsize::new(0));
    runner.register("slow", sleeper(200, &counter)).unwrap();

    let group = runner
        .serial(["slow"])
        .with_timeout(Duration::from_millis(20));
    let res = runner.run(group).unwrap().unwrap().await;

    assert_eq!(
        res,
        Err(TaskError::Timeout {
            timeout: Duration::from_millis(20)
        })
    );
    assert!(!runner.is_running("slow"));
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::TaskStarting, "slow"), 1);
    assert_eq!(count(&events, EventKind::TaskFinished, "slow"), 1);
    assert!(
        position(&events, EventKind::TaskFinished, "slow")
            < position(&events, EventKind::TaskFinished, "serial")
    );
}
