//! Shared mailbox between the reader threads and the blocking main thread.
//!
//! The state word forms a three-valued lattice `AwaitingMessage ->
//! MessageSent -> AwaitingMessage ... -> Closed`; transitions happen by
//! compare-and-set, and only `Closed` is terminal. A condvar supplies the
//! futex-style wait/notify half.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex};

pub(crate) const AWAITING_MESSAGE: u32 = 0;
pub(crate) const MESSAGE_SENT: u32 = 1;
pub(crate) const CLOSED: u32 = 2;

/// One event from the child's stdio, posted by a reader thread.
#[derive(Debug)]
pub(crate) enum Event {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    Exit(std::process::ExitStatus),
    Error(std::io::Error),
}

pub(crate) struct Mailbox {
    state: AtomicU32,
    queue: Mutex<VecDeque<Event>>,
    ready: Condvar,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            state: AtomicU32::new(AWAITING_MESSAGE),
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }

    /// Post an event. Returns false if the mailbox is closed.
    pub fn post(&self, event: Event) -> bool {
        let mut queue = self.queue.lock().expect("mailbox is never poisoned");
        match self.state.compare_exchange(
            AWAITING_MESSAGE,
            MESSAGE_SENT,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) | Err(MESSAGE_SENT) => {}
            Err(_) => return false, // Closed is terminal.
        }
        queue.push_back(event);
        self.ready.notify_one();
        true
    }

    /// Block until the next event. `None` means the mailbox is closed and
    /// drained.
    pub fn yield_next(&self) -> Option<Event> {
        let mut queue = self.queue.lock().expect("mailbox is never poisoned");
        loop {
            if let Some(event) = queue.pop_front() {
                if queue.is_empty() {
                    // Sent -> Awaiting; a racing close stays closed.
                    _ = self.state.compare_exchange(
                        MESSAGE_SENT,
                        AWAITING_MESSAGE,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                }
                return Some(event);
            }
            if self.state.load(Ordering::Acquire) == CLOSED {
                return None;
            }
            queue = self
                .ready
                .wait(queue)
                .expect("mailbox is never poisoned");
        }
    }

    /// Transition to the terminal state and wake every waiter. Events
    /// already queued are still delivered before `yield_next` reports
    /// closure.
    pub fn close(&self) {
        let _queue = self.queue.lock().expect("mailbox is never poisoned");
        self.state.store(CLOSED, Ordering::Release);
        self.ready.notify_all();
    }

    #[cfg(test)]
    pub fn state(&self) -> u32 {
        self.state.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_post_and_yield_preserve_order() {
        let mailbox = Mailbox::new();
        assert_eq!(mailbox.state(), AWAITING_MESSAGE);

        assert!(mailbox.post(Event::Stdout(vec![1])));
        assert!(mailbox.post(Event::Stderr(vec![2])));
        assert_eq!(mailbox.state(), MESSAGE_SENT);

        match mailbox.yield_next() {
            Some(Event::Stdout(bytes)) => assert_eq!(bytes, vec![1]),
            other => panic!("unexpected event: {other:?}"),
        }
        match mailbox.yield_next() {
            Some(Event::Stderr(bytes)) => assert_eq!(bytes, vec![2]),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(mailbox.state(), AWAITING_MESSAGE);
    }

    #[test]
    fn test_close_is_terminal_but_drains() {
        let mailbox = Mailbox::new();
        assert!(mailbox.post(Event::Stdout(vec![7])));
        mailbox.close();

        // The queued event is still delivered, then closure.
        assert!(matches!(mailbox.yield_next(), Some(Event::Stdout(_))));
        assert!(mailbox.yield_next().is_none());
        assert!(mailbox.yield_next().is_none());

        // Posting after close is refused; Closed never transitions out.
        assert!(!mailbox.post(Event::Stdout(vec![8])));
        assert_eq!(mailbox.state(), CLOSED);
    }

    #[test]
    fn test_blocking_yield_wakes_on_post() {
        let mailbox = Arc::new(Mailbox::new());

        let waiter = {
            let mailbox = Arc::clone(&mailbox);
            std::thread::spawn(move || mailbox.yield_next())
        };
        // Give the waiter a moment to block, then post.
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(mailbox.post(Event::Stdout(vec![42])));

        match waiter.join().unwrap() {
            Some(Event::Stdout(bytes)) => assert_eq!(bytes, vec![42]),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_blocking_yield_wakes_on_close() {
        let mailbox = Arc::new(Mailbox::new());
        let waiter = {
            let mailbox = Arc::clone(&mailbox);
            std::thread::spawn(move || mailbox.yield_next())
        };
        std::thread::sleep(std::time::Duration::from_millis(10));
        mailbox.close();
        assert!(waiter.join().unwrap().is_none());
    }
}
