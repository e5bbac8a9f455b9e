// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Write-once deferred values populated by provisioning.

use crate::error::{GroundworkError, Result};
use crate::graph::node::NodeId;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex};

type Continuation<T> = Box<dyn FnOnce(Result<T>) + Send>;

enum CellState<T> {
    Pending(Vec<Continuation<T>>),
    Resolved(T),
    Failed(GroundworkError),
}

struct OutputCell<T> {
    state: Mutex<CellState<T>>,
}

impl<T: Clone + Send + 'static> OutputCell<T> {
    fn settle(&self, result: Result<T>) {
        let continuations = {
            let mut state = self.state.lock().expect("output state lock poisoned");
            match &mut *state {
                CellState::Pending(continuations) => {
                    let continuations = std::mem::take(continuations);
                    *state = match result.clone() {
                        Ok(value) => CellState::Resolved(value),
                        Err(error) => CellState::Failed(error),
                    };
                    continuations
                }
                // Outputs are write-once; a second settle is ignored.
                _ => return,
            }
        };

        for continuation in continuations {
            continuation(result.clone());
        }
    }

    fn on_settle(&self, f: impl FnOnce(Result<T>) + Send + 'static) {
        let settled = {
            let mut state = self.state.lock().expect("output state lock poisoned");
            match &mut *state {
                CellState::Pending(continuations) => {
                    continuations.push(Box::new(f));
                    return;
                }
                CellState::Resolved(value) => Ok(value.clone()),
                CellState::Failed(error) => Err(error.clone()),
            }
        };
        f(settled);
    }
}

/// A value that becomes available once its source resource nodes provision.
///
/// Continuations registered with [`Output::map`] and friends run when the
/// source settles, on whichever thread performs the settle; callers must not
/// assume any particular call-stack identity. Cells are write-once: the first
/// settle wins and later ones are ignored.
pub struct Output<T> {
    cell: Arc<OutputCell<T>>,
    sources: BTreeSet<NodeId>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            sources: self.sources.clone(),
        }
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.cell.state.lock().expect("output state lock poisoned") {
            CellState::Pending(_) => "pending",
            CellState::Resolved(_) => "resolved",
            CellState::Failed(_) => "failed",
        };
        write!(f, "Output<{}: {}>", std::any::type_name::<T>(), state)
    }
}

impl<T: Clone + Send + 'static> Output<T> {
    /// Lift an already-known value into an output
    pub fn resolved(value: T) -> Self {
        Self {
            cell: Arc::new(OutputCell {
                state: Mutex::new(CellState::Resolved(value)),
            }),
            sources: BTreeSet::new(),
        }
    }

    pub(crate) fn pending(sources: BTreeSet<NodeId>) -> Self {
        Self {
            cell: Arc::new(OutputCell {
                state: Mutex::new(CellState::Pending(Vec::new())),
            }),
            sources,
        }
    }

    pub(crate) fn resolve(&self, value: T) {
        self.cell.settle(Ok(value));
    }

    pub(crate) fn fail(&self, error: GroundworkError) {
        self.cell.settle(Err(error));
    }

    /// Identifiers of the resource nodes this output ultimately reads from.
    /// Preserved through `map` and unioned by `join`, so the graph engine can
    /// enumerate dependency edges from any composed value.
    pub fn sources(&self) -> &BTreeSet<NodeId> {
        &self.sources
    }

    /// The settled result, or `None` while provisioning is still pending
    pub fn settled(&self) -> Option<Result<T>> {
        match &*self.cell.state.lock().expect("output state lock poisoned") {
            CellState::Pending(_) => None,
            CellState::Resolved(value) => Some(Ok(value.clone())),
            CellState::Failed(error) => Some(Err(error.clone())),
        }
    }

    /// The resolved value, if there is one
    pub fn get(&self) -> Option<T> {
        self.settled().and_then(|result| result.ok())
    }

    /// Derive a new output by transforming this one once it resolves.
    ///
    /// The closure runs only after the source resolves; a failed source
    /// propagates its error unchanged without invoking the closure.
    pub fn map<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.try_map(move |value| Ok(f(value)))
    }

    /// Like [`Output::map`] for fallible transforms. An `Err` from the
    /// closure fails the derived output with the rendered cause chain.
    pub fn try_map<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> anyhow::Result<U> + Send + 'static,
    {
        let derived = Output::pending(self.sources.clone());
        let cell = derived.cell.clone();

        self.cell.on_settle(move |result| match result {
            Ok(value) => match f(value) {
                Ok(mapped) => cell.settle(Ok(mapped)),
                Err(error) => cell.settle(Err(GroundworkError::Transform(format!("{error:#}")))),
            },
            Err(error) => cell.settle(Err(error)),
        });

        derived
    }
}

/// Combine two outputs into one that resolves to the pair once both resolve.
/// If any input fails, the joined output fails with the first-declared
/// failing input's error.
pub fn join2<A, B>(a: &Output<A>, b: &Output<B>) -> Output<(A, B)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    let mut sources = a.sources.clone();
    sources.extend(b.sources.iter().copied());
    let joined = Output::pending(sources);

    let slots = Arc::new(Mutex::new((None::<Result<A>>, None::<Result<B>>)));

    let cell = joined.cell.clone();
    let left_slots = slots.clone();
    a.cell.on_settle(move |result| {
        let settled = {
            let mut slots = left_slots.lock().expect("join slots lock poisoned");
            slots.0 = Some(result);
            take_settled(&mut slots)
        };
        if let Some((left, right)) = settled {
            cell.settle(combine(left, right));
        }
    });

    let cell = joined.cell.clone();
    b.cell.on_settle(move |result| {
        let settled = {
            let mut slots = slots.lock().expect("join slots lock poisoned");
            slots.1 = Some(result);
            take_settled(&mut slots)
        };
        if let Some((left, right)) = settled {
            cell.settle(combine(left, right));
        }
    });

    joined
}

/// Combine three outputs into one that resolves to the triple once all
/// resolve, with the same left-to-right failure tie-break as [`join2`].
pub fn join3<A, B, C>(a: &Output<A>, b: &Output<B>, c: &Output<C>) -> Output<(A, B, C)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
{
    let pair = join2(a, b);
    join2(&pair, c).map(|((a, b), c)| (a, b, c))
}

fn take_settled<A, B>(
    slots: &mut (Option<Result<A>>, Option<Result<B>>),
) -> Option<(Result<A>, Result<B>)> {
    match (slots.0.take(), slots.1.take()) {
        (Some(left), Some(right)) => Some((left, right)),
        (left, right) => {
            slots.0 = left;
            slots.1 = right;
            None
        }
    }
}

fn combine<A, B>(left: Result<A>, right: Result<B>) -> Result<(A, B)> {
    match (left, right) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
    }
}
