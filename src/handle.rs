//! Tagged handles over closed sets of scene object kinds.
//!
//! Every interface (shape, light, material, ...) is a handle generated by `tagged_handle!`.
//! A handle is a plain enum so calls through it compile to a `match`, with no vtable and no boxing.
//! The traits here let generic code ask a handle about its kind without knowing the concrete
//! handle type.

pub(crate) mod sealed {
    pub trait Sealed<H> {}
}

/// Implemented (only by `tagged_handle!`) for every kind a handle `H` can hold.
pub trait Member<H>: sealed::Sealed<H> {
    /// Tag of this kind within `H`, always nonzero.
    const TAG: u8;
}

/// A visitor passed to a handle's `dispatch`, implemented once per kind it accepts.
pub trait Visit<K: ?Sized> {
    type Output;

    fn visit(self, kind: &K) -> Self::Output;
}

/// Anything that reports a handle tag. `None` of an optional handle is the empty handle with tag 0.
pub trait Tagged {
    fn tag(&self) -> u8;

    fn is_empty(&self) -> bool {
        self.tag() == 0
    }
}

impl<H: Tagged> Tagged for Option<H> {
    fn tag(&self) -> u8 {
        match self {
            Some(h) => h.tag(),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Clone, Debug, PartialEq)]
    struct Apple(u32);
    #[derive(Clone, Debug, PartialEq)]
    struct Pear(f32);
    #[derive(Debug, PartialEq)]
    struct Plum;

    tagged_handle! {
        enum Fruit<'a>: &'a {
            Apple(Apple),
            Pear(Pear),
            Plum(Plum),
        }
    }

    tagged_handle! {
        #[derive(Clone, Debug)]
        enum Basket {
            Apple(Apple),
            Pear(Pear),
        }
    }

    struct Describe;

    impl Visit<Apple> for Describe {
        type Output = String;
        fn visit(self, kind: &Apple) -> String {
            format!("apple {}", kind.0)
        }
    }

    impl Visit<Pear> for Describe {
        type Output = String;
        fn visit(self, kind: &Pear) -> String {
            format!("pear {}", kind.0)
        }
    }

    impl Visit<Plum> for Describe {
        type Output = String;
        fn visit(self, _kind: &Plum) -> String {
            "plum".to_string()
        }
    }

    #[test]
    fn tags_follow_declaration_order() {
        let (a, p, q) = (Apple(1), Pear(2.0), Plum);
        assert_eq!(Fruit::from(&a).tag(), 1);
        assert_eq!(Fruit::from(&p).tag(), 2);
        assert_eq!(Fruit::from(&q).tag(), 3);
        assert_eq!(<Plum as Member<Fruit>>::TAG, 3);
    }

    #[test]
    fn empty_handle_has_tag_zero() {
        let none: Option<Fruit> = None;
        assert_eq!(none.tag(), 0);
        assert!(none.is_empty());

        let a = Apple(3);
        let some = Some(Fruit::from(&a));
        assert_eq!(some.tag(), 1);
        assert!(!some.is_empty());
    }

    #[test]
    fn cast_recovers_the_same_object() {
        let p = Pear(0.25);
        let h = Fruit::from(&p);
        assert!(h.is::<Pear>());
        assert!(!h.is::<Apple>());
        assert!(std::ptr::eq(h.cast::<Pear>(), &p));
        assert!(h.try_cast::<Apple>().is_none());
    }

    #[test]
    #[should_panic(expected = "cannot cast Fruit")]
    fn cast_to_wrong_kind_panics() {
        let a = Apple(7);
        let h = Fruit::from(&a);
        let _ = h.cast::<Plum>();
    }

    #[test]
    fn dispatch_matches_direct_call() {
        let a = Apple(42);
        let p = Pear(1.5);
        assert_eq!(Fruit::from(&a).dispatch(Describe), Describe.visit(&a));
        assert_eq!(Fruit::from(&p).dispatch(Describe), "pear 1.5");
        assert_eq!(Fruit::from(&Plum).dispatch(Describe), "plum");
    }

    #[test]
    fn equality_is_by_identity() {
        let a1 = Apple(1);
        let a2 = Apple(1);
        assert_eq!(Fruit::from(&a1), Fruit::from(&a1));
        assert_ne!(Fruit::from(&a1), Fruit::from(&a2));

        let mut index = HashMap::new();
        index.insert(Fruit::from(&a1), 0usize);
        index.insert(Fruit::from(&a2), 1usize);
        assert_eq!(index[&Fruit::from(&a2)], 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn borrowed_handle_is_two_words() {
        assert_eq!(std::mem::size_of::<Fruit>(), 2 * std::mem::size_of::<usize>());
        assert_eq!(std::mem::size_of::<Option<Fruit>>(), std::mem::size_of::<Fruit>());
    }

    #[test]
    fn owned_handle() {
        let b = Basket::from(Pear(3.0));
        assert_eq!(b.tag(), 2);
        assert_eq!(b.cast::<Pear>(), &Pear(3.0));
        assert!(b.try_cast::<Apple>().is_none());
        assert_eq!(b.clone().dispatch(Describe), "pear 3");
    }
}
