// Copyright 2019 The Druid Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cheap change detection for values.

use std::{ptr, rc::Rc, sync::Arc};

/// Values that can be compared cheaply to detect changes.
///
/// `same` is a strict equality: it compares primitives by value, but reference-counted
/// containers by identity. Two containers with equal contents but different allocations are
/// *not* the same. Producers of new values are expected to allocate a new container when, and
/// only when, the contents change.
pub trait Data: Clone + 'static {
    fn same(&self, other: &Self) -> bool;
}

/// An impl of `Data` suitable for simple types.
///
/// The `same` method is implemented with equality, so the type should
/// implement `Eq` at least.
macro_rules! impl_data_simple {
    ($($t:ty),*) => {
        $(impl Data for $t {
            fn same(&self, other: &Self) -> bool {
                self == other
            }
        })*
    };
}

impl_data_simple!(i8, i16, i32, i64, i128, isize);
impl_data_simple!(u8, u16, u32, u64, u128, usize);
impl_data_simple!(char, bool, String);
impl_data_simple!(std::time::Instant, std::time::Duration);

impl Data for &'static str {
    fn same(&self, other: &Self) -> bool {
        ptr::eq(*self, *other)
    }
}

impl Data for f32 {
    fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl Data for f64 {
    fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl<T: ?Sized + 'static> Data for Arc<T> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized + 'static> Data for Rc<T> {
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized + 'static> Data for std::rc::Weak<T> {
    fn same(&self, other: &Self) -> bool {
        std::rc::Weak::ptr_eq(self, other)
    }
}

impl<T: Data> Data for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Data, U: Data> Data for Result<T, U> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Ok(a), Ok(b)) => a.same(b),
            (Err(a), Err(b)) => a.same(b),
            _ => false,
        }
    }
}

impl Data for () {
    fn same(&self, _other: &Self) -> bool {
        true
    }
}

impl<T: 'static + ?Sized> Data for std::marker::PhantomData<T> {
    fn same(&self, _other: &Self) -> bool {
        true
    }
}

macro_rules! impl_data_tuple {
    ($($n:tt $t:ident),*) => {
        impl<$($t: Data),*> Data for ($($t,)*) {
            fn same(&self, other: &Self) -> bool {
                $(self.$n.same(&other.$n))&&*
            }
        }
    };
}

impl_data_tuple!(0 T0);
impl_data_tuple!(0 T0, 1 T1);
impl_data_tuple!(0 T0, 1 T1, 2 T2);
impl_data_tuple!(0 T0, 1 T1, 2 T2, 3 T3);
impl_data_tuple!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4);
impl_data_tuple!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5);

impl<T: Data, const N: usize> Data for [T; N] {
    fn same(&self, other: &Self) -> bool {
        self.iter().zip(other.iter()).all(|(a, b)| a.same(b))
    }
}
