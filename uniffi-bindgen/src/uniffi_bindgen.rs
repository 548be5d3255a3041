//! Generates Swift and Kotlin bindings from the compiled `vcxkit` library.

fn main() {
    uniffi::uniffi_bindgen_main();
}
