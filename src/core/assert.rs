/*!
 * Kernel Assertions
 *
 * Invariant violations in the scheduler are programmer errors: they are
 * logged and then halt the caller. Nothing here is recoverable.
 */

/// Assert a scheduler invariant, logging the violation before panicking
///
/// # Examples
///
/// ```should_panic
/// use kernel_sched::kassert;
///
/// let queued = true;
/// kassert!(!queued, "thread is already on a queue");
/// ```
#[macro_export]
macro_rules! kassert {
    ($cond:expr $(,)?) => {
        $crate::kassert!($cond, "{}", stringify!($cond))
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            let message = format!($($arg)+);
            $crate::__tracing::error!(
                assertion = stringify!($cond),
                "kernel assertion failed: {}",
                message
            );
            panic!("kernel assertion failed: {}", message);
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_passing_assertion_is_silent() {
        kassert!(1 + 1 == 2);
        kassert!(true, "never shown {}", 42);
    }

    #[test]
    #[should_panic(expected = "kernel assertion failed: bad state 7")]
    fn test_failing_assertion_panics_with_message() {
        kassert!(false, "bad state {}", 7);
    }
}
