//! Tests for the fan-out combinators: all, try_all, all_settled and joins

use flux_future::{
    all, all_settled, join, join3, join4, join5, try_all, try_join, Future, FutureError, Outcome,
};
use quickcheck_macros::quickcheck;
use std::collections::HashSet;
use std::panic;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn sleeper<T>(millis: u64, value: T) -> Future<T>
where
    T: Clone + Send + 'static,
{
    Future::new(move || {
        thread::sleep(Duration::from_millis(millis));
        value
    })
}

#[test]
fn test_all() {
    let futures = vec![sleeper(200, 1), sleeper(100, 2), Future::ready(3)];

    let combined = all(futures);

    assert_eq!(combined.wait(), vec![1, 2, 3]);
}

#[test]
fn test_all_runs_in_parallel() {
    let delay = 200;
    let futures: Vec<_> = (0..8).map(|i| sleeper(delay, i)).collect();

    let start = Instant::now();
    let values = all(futures).wait();
    let elapsed = start.elapsed();

    assert_eq!(values, (0..8).collect::<Vec<_>>());
    // Sequential evaluation would take 1600ms
    assert!(elapsed < Duration::from_millis(delay * 4), "took {:?}", elapsed);
}

#[test]
fn test_all_evaluates_each_input_on_its_own_thread() {
    let caller = thread::current().id();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let futures: Vec<_> = (0..4)
        .map(|_| {
            let seen = Arc::clone(&seen);
            Future::new(move || {
                seen.lock().unwrap().push(thread::current().id());
            })
        })
        .collect();
    all(futures).wait();

    let ids = seen.lock().unwrap();
    let distinct: HashSet<_> = ids.iter().collect();
    assert_eq!(distinct.len(), 4);
    assert!(!ids.contains(&caller));
}

#[test]
fn test_all_result_is_memoized() {
    let combined = all(vec![Future::ready("a"), Future::ready("b")]);

    assert_eq!(combined.wait(), vec!["a", "b"]);
    assert!(combined.is_fulfilled());
    assert_eq!(combined.wait(), vec!["a", "b"]);
}

#[test]
fn test_all_propagates_panic_without_hanging() {
    let futures = vec![
        Future::ready(1),
        Future::new(|| panic!("second input failed")),
        sleeper(50, 3),
    ];
    let combined = all(futures);

    let caught = panic::catch_unwind(panic::AssertUnwindSafe(|| combined.wait()));
    let payload = caught.unwrap_err();
    assert_eq!(
        payload.downcast_ref::<&str>().copied(),
        Some("second input failed")
    );
}

#[test]
fn test_try_all_reports_first_failure_by_position() {
    let futures = vec![
        Future::ready(1),
        Future::new(|| panic!("middle")),
        Future::new(|| panic!("last")),
    ];

    let result = try_all(futures).wait();

    assert_eq!(
        result,
        Err(FutureError::Panicked { message: "middle".to_string() })
    );
}

#[test]
fn test_try_all_success() {
    let futures = vec![sleeper(30, 'a'), Future::ready('b')];

    assert_eq!(try_all(futures).wait(), Ok(vec!['a', 'b']));
}

#[test]
fn test_all_settled_reports_partial_failure() {
    let futures = vec![
        Future::ready(10),
        Future::new(|| panic!("bad input")),
        sleeper(20, 30),
    ];

    let settled = all_settled(futures).wait();

    assert_eq!(settled.len(), 3);
    assert_eq!(settled[0], Ok(10));
    assert_eq!(
        settled[1],
        Err(FutureError::Panicked { message: "bad input".to_string() })
    );
    assert_eq!(settled[2], Ok(30));
}

#[test]
fn test_all_over_outcomes() {
    let futures = vec![
        Future::ready(Outcome::ok(1)),
        Future::new(|| Outcome::err(anyhow::anyhow!("lookup failed"))),
    ];

    let outcomes = all(futures).wait();

    assert!(outcomes[0].is_ok());
    let (value, error) = outcomes[1].clone().unwrap();
    assert!(value.is_none());
    assert_eq!(error.unwrap().to_string(), "lookup failed");
}

#[test]
fn test_join() {
    let (n, s) = join(&Future::ready(1), &Future::ready("a"));

    assert_eq!(n, 1);
    assert_eq!(s, "a");
}

#[test]
fn test_join3() {
    let result = join3(&sleeper(50, 1), &Future::ready("b"), &sleeper(20, 'c'));

    assert_eq!(result, (1, "b", 'c'));
}

#[test]
fn test_join4() {
    let result = join4(
        &Future::ready(1u8),
        &sleeper(30, 2u16),
        &Future::ready(3u32),
        &sleeper(10, 4u64),
    );

    assert_eq!(result, (1, 2, 3, 4));
}

#[test]
fn test_join5() {
    let result = join5(
        &Future::ready(1),
        &Future::ready("a"),
        &Future::ready(true),
        &Future::ready(2.0),
        &Future::ready('x'),
    );

    assert_eq!(result, (1, "a", true, 2.0, 'x'));
}

#[test]
fn test_join5_runs_in_parallel() {
    let start = Instant::now();
    let result = join5(
        &sleeper(150, 1),
        &sleeper(150, 2),
        &sleeper(150, 3),
        &sleeper(150, 4),
        &sleeper(150, 5),
    );

    assert_eq!(result, (1, 2, 3, 4, 5));
    assert!(start.elapsed() < Duration::from_millis(450));
}

#[test]
fn test_join_keeps_fulfilled_inputs() {
    let a = Future::ready(5);
    let b = a.map(|n| n * 2);

    assert_eq!(join(&a, &b), (5, 10));
    assert!(a.is_fulfilled());
    assert!(b.is_fulfilled());
}

#[test]
fn test_join_propagates_panic() {
    let good = Future::ready(1);
    let bad: Future<i32> = Future::new(|| panic!("right side"));

    let caught = panic::catch_unwind(panic::AssertUnwindSafe(|| join(&good, &bad)));

    assert!(caught.is_err());
    assert!(good.is_fulfilled());
}

/// Run `body` on a helper thread and fail the test if it never returns
fn within<T, F>(limit: Duration, body: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(body());
    });
    rx.recv_timeout(limit).expect("evaluation did not finish")
}

#[test]
fn test_cycle_through_try_join_is_reported() {
    let outcome = within(Duration::from_secs(5), || {
        let handle: Arc<Mutex<Option<Future<Result<(i32, i32), FutureError>>>>> =
            Arc::new(Mutex::new(None));
        let f = {
            let handle = Arc::clone(&handle);
            Future::new(move || {
                let me = handle.lock().unwrap().clone();
                match me {
                    Some(me) => try_join(&me, &Future::ready(1))
                        .and_then(|(inner, one)| inner.map(|(left, _)| (left, one))),
                    None => Ok((0, 0)),
                }
            })
        };
        *handle.lock().unwrap() = Some(f.clone());
        f.wait()
    });

    assert_eq!(outcome, Err(FutureError::Cycle));
}

#[test]
fn test_cycle_across_join_panics_instead_of_hanging() {
    let panicked = within(Duration::from_secs(5), || {
        let g_handle: Arc<Mutex<Option<Future<i32>>>> = Arc::new(Mutex::new(None));
        let f = {
            let g_handle = Arc::clone(&g_handle);
            Future::new(move || {
                let g = g_handle.lock().unwrap().clone();
                g.map_or(0, |g| g.wait() + 1)
            })
        };
        let g = {
            let f = f.clone();
            Future::new(move || f.wait() + 1)
        };
        *g_handle.lock().unwrap() = Some(g.clone());

        panic::catch_unwind(panic::AssertUnwindSafe(|| join(&f, &g))).is_err()
    });

    assert!(panicked);
}

#[test]
fn test_try_join() {
    assert_eq!(
        try_join(&Future::ready(1), &Future::ready(2)),
        Ok((1, 2))
    );

    let bad: Future<i32> = Future::new(|| panic!("nope"));
    assert_eq!(
        try_join(&Future::ready(1), &bad),
        Err(FutureError::Panicked { message: "nope".to_string() })
    );
}

#[quickcheck]
fn prop_all_preserves_order(values: Vec<u8>) -> bool {
    let values: Vec<u8> = values.into_iter().take(16).collect();
    let futures: Vec<_> = values
        .iter()
        .map(|&v| sleeper(u64::from(v % 5), v))
        .collect();

    all(futures).wait() == values
}
