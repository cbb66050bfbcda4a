//! Work queue: a multi-producer/multi-consumer FIFO built on a mutex and
//! condition variable, matching the reference implementation's `queue.h`
//! rather than reaching for a channel crate (see DESIGN.md).

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    /// Push one item and wake a waiting consumer.
    pub fn push(&self, item: T) {
        let mut items = self.items.lock().unwrap();
        items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Block until an item is available, then pop and return it.
    pub fn pop(&self) -> T {
        let mut items = self.items.lock().unwrap();
        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            items = self.not_empty.wait(items).unwrap();
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order_preserved() {
        let q = WorkQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.pop(), 1);
        assert_eq!(q.pop(), 2);
        assert_eq!(q.pop(), 3);
    }

    #[test]
    fn each_worker_observes_exactly_one_sentinel() {
        let q = Arc::new(WorkQueue::new());
        const WORKERS: usize = 4;

        for _ in 0..10 {
            q.push(Some(1));
        }
        for _ in 0..WORKERS {
            q.push(None::<i32>);
        }

        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    let mut popped_sentinel = false;
                    loop {
                        match q.pop() {
                            Some(_) => continue,
                            None => {
                                popped_sentinel = true;
                                break;
                            }
                        }
                    }
                    popped_sentinel
                })
            })
            .collect();

        for h in handles {
            assert!(h.join().unwrap());
        }
        assert!(q.is_empty());
    }
}
