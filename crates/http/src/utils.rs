//! Small internal helpers.

/// Early-returns `Err($error)` when the predicate does not hold.
///
/// Validation counterpart of `assert!`: same shape, but parse code wants
/// an error value back, not a panic.
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
