//! Deferred dispatch.
//!
//! Streams never run deferred work themselves. Terminal notifications, error surfacing and flow
//! restarts are handed to a [`Scheduler`], which runs them after the current call stack unwinds.

use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use futures::task::AtomicWaker;
use pin_project::pin_project;
use std::{cell::RefCell, collections::VecDeque, fmt, rc::Rc};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Runs tasks after the current call stack unwinds.
pub trait Scheduler {
    /// Queue `task` to run on a later turn.
    ///
    /// Tasks must run in the order they were deferred.
    fn defer(&self, task: Task);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn defer(&self, task: Task) {
        S::defer(self, task)
    }
}

#[derive(Default)]
struct Queue {
    tasks: RefCell<VecDeque<Task>>,
    waker: AtomicWaker,
}

/// A FIFO task queue drained explicitly by its owner.
///
/// Cloning the scheduler shares the queue.
#[derive(Clone, Default)]
pub struct ManualScheduler(Rc<Queue>);

impl ManualScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued tasks.
    pub fn pending(&self) -> usize {
        self.0.tasks.borrow().len()
    }

    /// Runs the oldest queued task. Returns `false` if the queue was empty.
    pub fn run_once(&self) -> bool {
        let task = self.0.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs tasks, including tasks deferred by other tasks, until the queue is empty.
    ///
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while self.run_once() {
            count += 1;
        }
        count
    }

    /// Create a future that drives `future` while running deferred tasks.
    pub fn drive<F: Future>(&self, future: F) -> Drive<F> {
        Drive {
            future,
            scheduler: self.clone(),
        }
    }

    /// Drives `future` to completion on the current thread while running deferred tasks.
    pub fn run_until<F: Future>(&self, future: F) -> F::Output {
        futures::executor::block_on(self.drive(future))
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&self, task: Task) {
        self.0.tasks.borrow_mut().push_back(task);
        self.0.waker.wake();
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Future produced by [`ManualScheduler::drive`].
#[pin_project]
pub struct Drive<F> {
    #[pin]
    future: F,
    scheduler: ManualScheduler,
}

impl<F: Future> Future for Drive<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let mut this = self.project();
        loop {
            this.scheduler.run_until_idle();
            if let Poll::Ready(output) = this.future.as_mut().poll(cx) {
                return Poll::Ready(output);
            }

            // Register before the final check so a task deferred after it still wakes us.
            this.scheduler.0.waker.register(cx.waker());
            if this.scheduler.pending() == 0 {
                return Poll::Pending;
            }
        }
    }
}
