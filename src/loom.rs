#[allow(unused_imports)]
pub(crate) use self::inner::*;

#[cfg(loom)]
mod inner {
    #![allow(dead_code, unused_imports)]

    pub(crate) use loom::{hint, model, thread};

    pub(crate) mod sync {
        pub(crate) use loom::sync::*;
    }
}

#[cfg(not(loom))]
mod inner {
    #![allow(dead_code, unused_imports)]

    pub(crate) use core::hint;

    pub(crate) mod sync {
        pub(crate) use core::sync::atomic;
        pub(crate) use std::sync::Arc;
    }


    /// Without loom, "model checking" means running the closure once on the
    /// real scheduler, with a test subscriber installed.
    #[cfg(test)]
    pub(crate) fn model(f: impl FnOnce()) {
        let _trace = crate::util::test::trace_init();
        f()
    }
}
