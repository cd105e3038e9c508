//! Fan-out combinators
//!
//! `all` and its fallible variants build a lazy future that evaluates its
//! inputs on parallel threads once awaited. `join`..`join5` evaluate
//! eagerly and return tuples; the wider joins split into nested pairs.

use super::Future;
use crate::error::FutureError;
use crate::runtime::concurrency::{Slot, TaskGroup};
use tracing::debug;

/// Evaluate every future on its own thread and collect the values in
/// input order.
///
/// Lazy: nothing is spawned until the returned future is waited on. If a
/// task panics, the panic of the first failing input is resumed on the
/// waiting thread after all tasks have finished.
pub fn all<A, I>(futures: I) -> Future<Vec<A>>
where
    A: Clone + Send + 'static,
    I: IntoIterator<Item = Future<A>>,
{
    let futures: Vec<Future<A>> = futures.into_iter().collect();
    Future::new(move || {
        fan_out("all", futures, |f| f.wait())
            .into_iter()
            .map(Slot::into_value)
            .collect()
    })
}

/// Like `all`, but reports the first failing input (by position) as an
/// error instead of panicking. Every input still runs to completion.
pub fn try_all<A, I>(futures: I) -> Future<Result<Vec<A>, FutureError>>
where
    A: Clone + Send + 'static,
    I: IntoIterator<Item = Future<A>>,
{
    let futures: Vec<Future<A>> = futures.into_iter().collect();
    Future::new(move || {
        fan_out("try_all", futures, |f| f.try_wait())
            .into_iter()
            .map(settle)
            .collect()
    })
}

/// Evaluate every future in parallel and report each outcome separately
pub fn all_settled<A, I>(futures: I) -> Future<Vec<Result<A, FutureError>>>
where
    A: Clone + Send + 'static,
    I: IntoIterator<Item = Future<A>>,
{
    let futures: Vec<Future<A>> = futures.into_iter().collect();
    Future::new(move || {
        fan_out("all_settled", futures, |f| f.try_wait())
            .into_iter()
            .map(settle)
            .collect()
    })
}

/// Evaluate two futures in parallel and return both values
pub fn join<A, B>(a: &Future<A>, b: &Future<B>) -> (A, B)
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    let (a, b) = (a.clone(), b.clone());
    let mut group = TaskGroup::new("join");
    let left = group.spawn(move || a.wait());
    let right = group.spawn(move || b.wait());
    group.wait();

    (left.into_value(), right.into_value())
}

/// Evaluate three futures: `join(a, b)` on one branch, `c` on the other
pub fn join3<A, B, C>(a: &Future<A>, b: &Future<B>, c: &Future<C>) -> (A, B, C)
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
{
    let (a, b, c) = (a.clone(), b.clone(), c.clone());
    let mut group = TaskGroup::new("join3");
    let left = group.spawn(move || join(&a, &b));
    let right = group.spawn(move || c.wait());
    group.wait();

    let (a, b) = left.into_value();
    (a, b, right.into_value())
}

/// Evaluate four futures as two parallel pairs
pub fn join4<A, B, C, D>(
    a: &Future<A>,
    b: &Future<B>,
    c: &Future<C>,
    d: &Future<D>,
) -> (A, B, C, D)
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
    D: Clone + Send + 'static,
{
    let (a, b, c, d) = (a.clone(), b.clone(), c.clone(), d.clone());
    let mut group = TaskGroup::new("join4");
    let left = group.spawn(move || join(&a, &b));
    let right = group.spawn(move || join(&c, &d));
    group.wait();

    let (a, b) = left.into_value();
    let (c, d) = right.into_value();
    (a, b, c, d)
}

/// Evaluate five futures: `join3(a, b, c)` beside `join(d, e)`
pub fn join5<A, B, C, D, E>(
    a: &Future<A>,
    b: &Future<B>,
    c: &Future<C>,
    d: &Future<D>,
    e: &Future<E>,
) -> (A, B, C, D, E)
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
    D: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let (a, b, c, d, e) = (a.clone(), b.clone(), c.clone(), d.clone(), e.clone());
    let mut group = TaskGroup::new("join5");
    let left = group.spawn(move || join3(&a, &b, &c));
    let right = group.spawn(move || join(&d, &e));
    group.wait();

    let (a, b, c) = left.into_value();
    let (d, e) = right.into_value();
    (a, b, c, d, e)
}

/// Evaluate two futures in parallel, reporting failures as errors.
///
/// When both sides fail, the error of `a` is returned.
pub fn try_join<A, B>(a: &Future<A>, b: &Future<B>) -> Result<(A, B), FutureError>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    let (a, b) = (a.clone(), b.clone());
    let mut group = TaskGroup::new("try_join");
    let left = group.spawn(move || a.try_wait());
    let right = group.spawn(move || b.try_wait());
    group.wait();

    let left = settle(left)?;
    let right = settle(right)?;
    Ok((left, right))
}

/// Spawn one task per future, wait for all of them, and hand back the
/// slots in input order.
fn fan_out<A, R, F>(label: &'static str, futures: Vec<Future<A>>, eval: F) -> Vec<Slot<R>>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(Future<A>) -> R + Clone + Send + 'static,
{
    if futures.is_empty() {
        return Vec::new();
    }

    debug!(label, tasks = futures.len(), "fanning out");
    let mut group = TaskGroup::new(label);
    let slots = futures
        .into_iter()
        .map(|f| {
            let eval = eval.clone();
            group.spawn(move || eval(f))
        })
        .collect();
    group.wait();

    slots
}

/// Flatten a fallible task's slot into one result
fn settle<A>(slot: Slot<Result<A, FutureError>>) -> Result<A, FutureError> {
    match slot.take() {
        Ok(result) => result,
        Err(failure) => Err(failure.to_error()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::Status;

    #[test]
    fn test_all_is_lazy_until_waited() {
        let inputs = vec![Future::ready(1), Future::ready(2)];
        let first = inputs[0].clone();
        let combined = all(inputs);

        assert_eq!(first.status(), Status::Pending);
        assert_eq!(combined.wait(), vec![1, 2]);
        assert_eq!(first.status(), Status::Fulfilled);
    }

    #[test]
    fn test_all_empty() {
        let combined = all(Vec::<Future<u8>>::new());
        assert!(combined.wait().is_empty());
    }

    #[test]
    fn test_try_join_prefers_left_error() {
        let a: Future<i32> = Future::new(|| panic!("left"));
        let b: Future<i32> = Future::new(|| panic!("right"));

        assert_eq!(
            try_join(&a, &b),
            Err(FutureError::Panicked { message: "left".to_string() })
        );
    }
}
