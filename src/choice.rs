//! The guarded-alternative idiom (spec.md §6's `choice` row), grounded in
//! `original_source/include/csp/patterns.h`'s higher-level helpers built
//! atop `alt`/`par`: `choice!` binds `{guard => action}` arms to a select
//! and runs whichever arm's action matches the committed index, instead of
//! making every caller write the match on the returned index by hand.

/// Builds an [`crate::alt::Alt`] over the given guards and runs the action
/// expression belonging to whichever guard was selected.
///
/// ```ignore
/// use csp_core::choice;
/// use csp_core::channel::blocking;
///
/// let a = blocking::channel::<i32>();
/// let b = blocking::channel::<i32>();
/// let ra = a.r#in().guarded();
/// let rb = b.r#in().guarded();
///
/// let result: i32 = choice! {
///     ra => ra.read().unwrap(),
///     rb => rb.read().unwrap(),
/// };
/// ```
///
/// Defaults to fair selection; prefix the block with `pri` to priority
/// select instead: `choice!(pri { ... })`.
#[macro_export]
macro_rules! choice {
    (pri { $($guard:expr => $action:expr),+ $(,)? }) => {{
        let mut __guards: Vec<Box<dyn $crate::alt::Guard>> = Vec::new();
        $( __guards.push(Box::new($guard.clone())); )+
        let mut __alt = $crate::alt::Alt::new(__guards);
        let __selected = __alt.pri_select().expect("choice!: select failed");
        $crate::choice!(@dispatch __selected, 0usize, $($action),+)
    }};
    ({ $($guard:expr => $action:expr),+ $(,)? }) => {{
        let mut __guards: Vec<Box<dyn $crate::alt::Guard>> = Vec::new();
        $( __guards.push(Box::new($guard.clone())); )+
        let mut __alt = $crate::alt::Alt::new(__guards);
        let __selected = __alt.fair_select().expect("choice!: select failed");
        $crate::choice!(@dispatch __selected, 0usize, $($action),+)
    }};
    (@dispatch $selected:ident, $index:expr, $action:expr) => {
        { let _ = $index; $action }
    };
    (@dispatch $selected:ident, $index:expr, $action:expr, $($rest:expr),+) => {
        if $selected == $index {
            $action
        } else {
            $crate::choice!(@dispatch $selected, $index + 1usize, $($rest),+)
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::channel::blocking;

    #[test]
    fn choice_runs_the_selected_arm() {
        let chan_a = blocking::channel::<i32>();
        let chan_b = blocking::channel::<i32>();
        let reader_a = chan_a.r#in().guarded();
        let reader_b = chan_b.r#in().guarded();
        let writer_b = chan_b.out();

        let h = std::thread::spawn(move || writer_b.write(99).unwrap());

        let got: i32 = choice! {
            reader_a => reader_a.read().unwrap(),
            reader_b => reader_b.read().unwrap()
        };
        assert_eq!(got, 99);
        h.join().unwrap();
    }
}
