//! Emulated virtual dispatch for extension getters and methods.
//!
//! Node behaviors such as `string_representation` are attached to a class
//! hierarchy from outside the node definitions. Each class gets a dense
//! slot id at registration; every message owns a table from slot id to an
//! optional handler. A lookup that misses walks the superclass chain and
//! memoizes the outcome back into the originating slot, so repeated
//! dispatch for a concrete class is a single array read.
//!
//! Tables are populated during startup and read-mostly afterward. The
//! interior mutability here is `RefCell`/`Cell`, so the whole structure is
//! single-threaded; a multi-threaded host must finish registration before
//! sharing.

use std::cell::{Cell, RefCell};

use tracing::{debug, trace};

/// Dense slot id of a registered class. Only `ClassRegistry::register`
/// mints these, so a superclass id always refers to an earlier
/// registration and chain walks terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(u32);

impl ClassId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct ClassInfo {
    name: &'static str,
    superclass: Option<ClassId>,
}

/// Single-inheritance class hierarchy shared by all message tables.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassInfo>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, superclass: Option<ClassId>) -> ClassId {
        let id = ClassId(u32::try_from(self.classes.len()).expect("class slot overflow"));
        debug!(name, superclass = ?superclass, slot = id.0, "registered node class");
        self.classes.push(ClassInfo { name, superclass });
        id
    }

    pub fn name(&self, class: ClassId) -> &'static str {
        self.classes[class.index()].name
    }

    pub fn superclass(&self, class: ClassId) -> Option<ClassId> {
        self.classes[class.index()].superclass
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

enum Slot<F> {
    Unknown,
    Resolved(F),
    /// Memoized negative outcome: the whole ancestry was searched once and
    /// registered nothing. Stable for the process lifetime, like every
    /// other written slot.
    Missing,
}

/// Per-message dispatch table.
pub struct MessageTable<F> {
    message: &'static str,
    slots: RefCell<Vec<Slot<F>>>,
    chain_walks: Cell<u64>,
}

impl<F: Clone> MessageTable<F> {
    pub fn new(message: &'static str) -> Self {
        Self {
            message,
            slots: RefCell::new(Vec::new()),
            chain_walks: Cell::new(0),
        }
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Registers the handler for one class slot. Slots are monotonic: a
    /// second registration for the same slot is a registration bug in the
    /// embedding component and panics.
    pub fn register(&self, class: ClassId, handler: F) {
        let mut slots = self.slots.borrow_mut();
        if slots.len() <= class.index() {
            slots.resize_with(class.index() + 1, || Slot::Unknown);
        }
        match slots[class.index()] {
            Slot::Unknown => slots[class.index()] = Slot::Resolved(handler),
            Slot::Resolved(_) | Slot::Missing => {
                panic!(
                    "duplicate handler registration for message '{}' on slot {}",
                    self.message,
                    class.index()
                );
            }
        }
    }

    /// Resolves the handler for a concrete class, walking the superclass
    /// chain on a cache miss. A message with no handler anywhere in the
    /// ancestry is a registration bug, not a user condition, and aborts.
    pub fn resolve(&self, registry: &ClassRegistry, class: ClassId) -> F {
        match self.try_resolve(registry, class) {
            Some(handler) => handler,
            None => panic!(
                "no handler for message '{}' in the ancestry of class '{}'",
                self.message,
                registry.name(class)
            ),
        }
    }

    /// Non-panicking resolution. The outcome, found or not, is memoized
    /// into the originating slot so the chain is walked at most once per
    /// concrete class.
    pub fn try_resolve(&self, registry: &ClassRegistry, class: ClassId) -> Option<F> {
        {
            let slots = self.slots.borrow();
            match slots.get(class.index()) {
                Some(Slot::Resolved(handler)) => return Some(handler.clone()),
                Some(Slot::Missing) => return None,
                Some(Slot::Unknown) | None => {}
            }
        }

        let mut outcome = None;
        let mut ancestor = registry.superclass(class);
        while let Some(current) = ancestor {
            self.chain_walks.set(self.chain_walks.get() + 1);
            {
                let slots = self.slots.borrow();
                match slots.get(current.index()) {
                    Some(Slot::Resolved(handler)) => {
                        outcome = Some(handler.clone());
                        break;
                    }
                    // An ancestor already searched its own ancestry and
                    // found nothing; ours ends the same way.
                    Some(Slot::Missing) => break,
                    Some(Slot::Unknown) | None => {}
                }
            }
            ancestor = registry.superclass(current);
        }

        trace!(
            message = self.message,
            class = registry.name(class),
            found = outcome.is_some(),
            "memoizing chain walk outcome"
        );
        let mut slots = self.slots.borrow_mut();
        if slots.len() <= class.index() {
            slots.resize_with(class.index() + 1, || Slot::Unknown);
        }
        if let Slot::Unknown = slots[class.index()] {
            slots[class.index()] = match &outcome {
                Some(handler) => Slot::Resolved(handler.clone()),
                None => Slot::Missing,
            };
        }
        outcome
    }

    /// Number of superclass-chain steps taken so far, for memoization
    /// checks in tests.
    pub fn chain_walks(&self) -> u64 {
        self.chain_walks.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Getter = fn() -> &'static str;

    fn base_getter() -> &'static str {
        "base"
    }

    fn leaf_getter() -> &'static str {
        "leaf"
    }

    fn hierarchy() -> (ClassRegistry, ClassId, ClassId, ClassId) {
        let mut registry = ClassRegistry::new();
        let base = registry.register("node", None);
        let middle = registry.register("command", Some(base));
        let leaf = registry.register("command-step", Some(middle));
        (registry, base, middle, leaf)
    }

    #[test]
    fn direct_registration_hits_the_fast_path() {
        let (registry, _, _, leaf) = hierarchy();
        let table: MessageTable<Getter> = MessageTable::new("string_representation");
        table.register(leaf, leaf_getter);
        assert_eq!(table.resolve(&registry, leaf)(), "leaf");
        assert_eq!(table.chain_walks(), 0);
    }

    #[test]
    fn subclass_inherits_superclass_handler() {
        let (registry, base, _, leaf) = hierarchy();
        let table: MessageTable<Getter> = MessageTable::new("string_representation");
        table.register(base, base_getter);
        assert_eq!(table.resolve(&registry, leaf)(), "base");
    }

    #[test]
    fn second_resolution_is_memoized_and_pointer_identical() {
        let (registry, base, _, leaf) = hierarchy();
        let table: MessageTable<Getter> = MessageTable::new("string_representation");
        table.register(base, base_getter);

        let first = table.resolve(&registry, leaf);
        let walks_after_first = table.chain_walks();
        assert!(walks_after_first > 0);

        let second = table.resolve(&registry, leaf);
        assert_eq!(table.chain_walks(), walks_after_first, "second call re-walked the chain");
        assert_eq!(first as usize, second as usize, "handler identity changed");
    }

    #[test]
    fn negative_outcome_is_memoized_too() {
        let (registry, _, _, leaf) = hierarchy();
        let table: MessageTable<Getter> = MessageTable::new("display");
        assert_eq!(table.try_resolve(&registry, leaf), None);
        let walks = table.chain_walks();
        assert_eq!(table.try_resolve(&registry, leaf), None);
        assert_eq!(table.chain_walks(), walks);
    }

    #[test]
    #[should_panic(expected = "duplicate handler registration")]
    fn re_registration_panics() {
        let (_, base, _, _) = hierarchy();
        let table: MessageTable<Getter> = MessageTable::new("string_representation");
        table.register(base, base_getter);
        table.register(base, leaf_getter);
    }

    #[test]
    #[should_panic(expected = "no handler for message 'display'")]
    fn missing_handler_anywhere_is_fatal() {
        let (registry, _, _, leaf) = hierarchy();
        let table: MessageTable<Getter> = MessageTable::new("display");
        table.resolve(&registry, leaf);
    }
}
