//! Release-once registry for a panel's change/message subscriptions

type Release = Box<dyn FnOnce()>;

/// Subscriptions held by a live panel
///
/// Releasing is idempotent: whichever dispose path runs first releases every
/// subscription, later calls do nothing.
#[derive(Default)]
pub struct Subscriptions {
    entries: Vec<(String, Release)>,
    disposed: bool,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription. Registering after disposal releases it at once.
    pub fn add(&mut self, label: impl Into<String>, release: impl FnOnce() + 'static) {
        let label = label.into();
        if self.disposed {
            tracing::debug!("Subscription {} added after dispose, releasing", label);
            release();
            return;
        }
        self.entries.push((label, Box::new(release)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release everything, most recent first. Returns how many were released.
    pub fn dispose(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        self.disposed = true;
        let count = self.entries.len();
        while let Some((label, release)) = self.entries.pop() {
            tracing::debug!("Releasing subscription {}", label);
            release();
        }
        count
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions")
            .field(
                "entries",
                &self.entries.iter().map(|(l, _)| l).collect::<Vec<_>>(),
            )
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
        let count = Rc::new(Cell::new(0));
        let handle = Rc::clone(&count);
        (count, move || handle.set(handle.get() + 1))
    }

    #[test]
    fn test_dispose_releases_once() {
        let (count, release) = counter();
        let mut subs = Subscriptions::new();
        subs.add("watcher", release);

        assert_eq!(subs.dispose(), 1);
        assert_eq!(subs.dispose(), 0);
        drop(subs);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_drop_releases() {
        let (count, release) = counter();
        {
            let mut subs = Subscriptions::new();
            subs.add("watcher", release);
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_add_after_dispose_releases_immediately() {
        let (count, release) = counter();
        let mut subs = Subscriptions::new();
        subs.dispose();
        subs.add("late", release);
        assert_eq!(count.get(), 1);
        assert!(subs.is_empty());
    }

    #[test]
    fn test_release_order_is_reversed() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut subs = Subscriptions::new();
        for name in ["first", "second"] {
            let order = Rc::clone(&order);
            subs.add(name, move || order.borrow_mut().push(name));
        }
        subs.dispose();
        assert_eq!(*order.borrow(), vec!["second", "first"]);
    }
}
