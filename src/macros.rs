/// Convenience macro that allows creating a Vec3f without needing to use f32 literals
///
/// ```
/// use lumen::{vec3f, Vec3f};
/// assert_eq!(vec3f!(1, 2, 3), Vec3f::new(1.0, 2.0, 3.0));
/// ```
///
#[macro_export]
macro_rules! vec3f {
    ($x:expr, $y:expr, $z:expr) => {
        $crate::Vec3f::new($x as $crate::Float, $y as $crate::Float, $z as $crate::Float)
    };
}

#[macro_export]
macro_rules! point3f {
    ( ($x:expr , $y:expr , $z:expr) ) => { $crate::Point3f::new($x as $crate::Float, $y as $crate::Float, $z as $crate::Float) };
    ($x:expr , $y:expr , $z:expr) => { $crate::Point3f::new($x as $crate::Float, $y as $crate::Float, $z as $crate::Float) };
}

#[macro_export]
macro_rules! point2f {
    ($x:expr , $y:expr) => { $crate::Point2f::new($x as $crate::Float, $y as $crate::Float) };
}

/// Generates a handle over a closed set of kinds.
///
/// The borrowed form (`enum Light<'a>: &'a { ... }`) stores a reference to the held object, is
/// `Copy`, and compares/orders/hashes by `(address, tag)` so it can key a map. The owned form
/// (`enum Sampler { ... }`) stores the object by value and is used for small or per-worker kinds.
///
/// Tags are assigned 1, 2, ... in declaration order, tag 0 is the empty state (`None` of
/// `Option<Handle>`, see [`crate::handle::Tagged`]). Both forms get `tag`, `is`, `cast`,
/// `try_cast`, `dispatch` and `From` conversions from each kind.
macro_rules! tagged_handle {
    (@members [$($lt:lifetime)?] $handle:ty; $tag:expr;) => {};
    (@members [$($lt:lifetime)?] $handle:ty; $tag:expr; $kind:ty, $($rest:ty,)*) => {
        impl$(<$lt>)? $crate::handle::sealed::Sealed<$handle> for $kind {}

        impl$(<$lt>)? $crate::handle::Member<$handle> for $kind {
            const TAG: u8 = $tag;
        }

        tagged_handle!(@members [$($lt)?] $handle; $tag + 1; $($rest,)*);
    };

    (@owned_from [$($lt:lifetime)?] $handle:ty;) => {};
    (@owned_from [$($lt:lifetime)?] $handle:ty; $variant:ident($kind:ty), $($rest:tt)*) => {
        impl$(<$lt>)? From<$kind> for $handle {
            fn from(kind: $kind) -> Self {
                Self::$variant(kind)
            }
        }

        tagged_handle!(@owned_from [$($lt)?] $handle; $($rest)*);
    };

    // Borrowed form
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident<$lt:lifetime>: &$ref_lt:lifetime {
            $($(#[$vmeta:meta])* $variant:ident($kind:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        $vis enum $name<$lt> {
            $($(#[$vmeta])* $variant(&$ref_lt $kind),)+
        }

        impl<$lt> $name<$lt> {
            /// Discriminant of the held kind, starting at 1.
            #[inline]
            pub fn tag(&self) -> u8 {
                match self {
                    $(Self::$variant(_) => <$kind as $crate::handle::Member<Self>>::TAG,)+
                }
            }

            #[inline]
            pub fn is<K: $crate::handle::Member<Self>>(&self) -> bool {
                self.tag() == K::TAG
            }

            /// Address of the held object.
            #[inline]
            pub fn addr(&self) -> *const () {
                match self {
                    $(Self::$variant(k) => *k as *const $kind as *const (),)+
                }
            }

            pub fn try_cast<K: $crate::handle::Member<Self> + $lt>(&self) -> Option<&$lt K> {
                if self.is::<K>() {
                    // SAFETY: every kind gets exactly one tag from this macro and `Member` is
                    // sealed, so a matching tag means the address was taken from a `&K`.
                    Some(unsafe { &*(self.addr() as *const K) })
                } else {
                    None
                }
            }

            pub fn cast<K: $crate::handle::Member<Self> + $lt>(&self) -> &$lt K {
                match self.try_cast::<K>() {
                    Some(kind) => kind,
                    None => panic!(
                        concat!("cannot cast ", stringify!($name), " holding tag {} to tag {}"),
                        self.tag(),
                        K::TAG
                    ),
                }
            }

            /// Invokes `visitor` with the held object typed as its exact kind.
            #[inline]
            pub fn dispatch<V, R>(&self, visitor: V) -> R
            where
                $(V: $crate::handle::Visit<$kind, Output = R>,)+
            {
                match self {
                    $(Self::$variant(k) => <V as $crate::handle::Visit<$kind>>::visit(visitor, *k),)+
                }
            }

            #[inline]
            fn key(&self) -> (usize, u8) {
                (self.addr() as usize, self.tag())
            }
        }

        impl<$lt> $crate::handle::Tagged for $name<$lt> {
            fn tag(&self) -> u8 {
                $name::tag(self)
            }
        }

        $(
            impl<$lt> From<&$ref_lt $kind> for $name<$lt> {
                fn from(kind: &$ref_lt $kind) -> Self {
                    Self::$variant(kind)
                }
            }
        )+

        impl<$lt> PartialEq for $name<$lt> {
            fn eq(&self, other: &Self) -> bool {
                self.key() == other.key()
            }
        }

        impl<$lt> Eq for $name<$lt> {}

        impl<$lt> PartialOrd for $name<$lt> {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl<$lt> Ord for $name<$lt> {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.key().cmp(&other.key())
            }
        }

        impl<$lt> std::hash::Hash for $name<$lt> {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.key().hash(state)
            }
        }

        impl<$lt> std::fmt::Debug for $name<$lt> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant(k) => write!(
                        f, concat!(stringify!($name), "::", stringify!($variant), "({:p})"), *k
                    ),)+
                }
            }
        }

        tagged_handle!(@members [$lt] $name<$lt>; 1u8; $($kind,)+);
    };

    // Owned form
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident $(<$lt:lifetime>)? {
            $($(#[$vmeta:meta])* $variant:ident($kind:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name $(<$lt>)? {
            $($(#[$vmeta])* $variant($kind),)+
        }

        impl $(<$lt>)? $name $(<$lt>)? {
            /// Discriminant of the held kind, starting at 1.
            #[inline]
            pub fn tag(&self) -> u8 {
                match self {
                    $(Self::$variant(_) => <$kind as $crate::handle::Member<Self>>::TAG,)+
                }
            }

            #[inline]
            pub fn is<K: $crate::handle::Member<Self>>(&self) -> bool {
                self.tag() == K::TAG
            }

            #[inline]
            fn payload_addr(&self) -> *const () {
                match self {
                    $(Self::$variant(k) => k as *const $kind as *const (),)+
                }
            }

            pub fn try_cast<'s, K: $crate::handle::Member<Self> + 's>(&'s self) -> Option<&'s K> {
                if self.is::<K>() {
                    // SAFETY: see the borrowed form, the payload of the matching variant is a `K`.
                    Some(unsafe { &*(self.payload_addr() as *const K) })
                } else {
                    None
                }
            }

            pub fn cast<'s, K: $crate::handle::Member<Self> + 's>(&'s self) -> &'s K {
                match self.try_cast::<K>() {
                    Some(kind) => kind,
                    None => panic!(
                        concat!("cannot cast ", stringify!($name), " holding tag {} to tag {}"),
                        self.tag(),
                        K::TAG
                    ),
                }
            }

            /// Invokes `visitor` with the held object typed as its exact kind.
            #[inline]
            pub fn dispatch<V, R>(&self, visitor: V) -> R
            where
                $(V: $crate::handle::Visit<$kind, Output = R>,)+
            {
                match self {
                    $(Self::$variant(k) => <V as $crate::handle::Visit<$kind>>::visit(visitor, k),)+
                }
            }
        }

        impl $(<$lt>)? $crate::handle::Tagged for $name $(<$lt>)? {
            fn tag(&self) -> u8 {
                $name::tag(self)
            }
        }

        tagged_handle!(@owned_from [$($lt)?] $name $(<$lt>)?; $($variant($kind),)+);
        tagged_handle!(@members [$($lt)?] $name $(<$lt>)?; 1u8; $($kind,)+);
    };
}

/// Forwards a kind-trait method through a handle: `each_kind!(self, A, B => |k| k.area())`.
macro_rules! each_kind {
    ($handle:ident, $($variant:ident),+ => |$k:ident| $body:expr) => {
        match $handle {
            $(Self::$variant($k) => $body,)+
        }
    };
}
