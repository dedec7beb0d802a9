// src/signal.rs

/// Synchronous observer list. Slots run on the caller's thread in the
/// order they were connected.
pub struct Signal<T> {
    slots: Vec<Box<dyn FnMut(&T)>>,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn connect<F>(&mut self, slot: F)
    where
        F: FnMut(&T) + 'static,
    {
        self.slots.push(Box::new(slot));
    }

    pub fn emit(&mut self, value: &T) {
        for slot in self.slots.iter_mut() {
            slot(value);
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn slots_run_in_connection_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signal: Signal<i32> = Signal::new();

        let first = seen.clone();
        signal.connect(move |v| first.borrow_mut().push(("first", *v)));
        let second = seen.clone();
        signal.connect(move |v| second.borrow_mut().push(("second", *v)));

        signal.emit(&7);

        assert_eq!(*seen.borrow(), vec![("first", 7), ("second", 7)]);
    }
}
