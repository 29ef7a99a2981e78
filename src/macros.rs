pub use enclose::*;

#[macro_export]
macro_rules! props {
    () => { $crate::Props::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::Props::new();
        $( props.insert($key, $value); )+
        props
    }};
}

#[macro_export]
macro_rules! callback {
    (( $($d_tt:tt)* ) $args:ident => $($b:tt)*) => {
        $crate::Callback::new($crate::macros::enclose!(($( $d_tt )*) move |$args: &[$crate::PropValue]| { $($b)* }))
    };
    ($args:ident => $($b:tt)*) => {
        $crate::Callback::new(move |$args: &[$crate::PropValue]| { $($b)* })
    };
}
