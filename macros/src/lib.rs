//! Procedural macros for the county-projection crate
//!
//! This crate provides the `Category` derive used by the fixed cohort axes
//! (age group, race, sex). Each axis is a fieldless enum whose variant order
//! is the axis order used by the dense cohort tables.

use proc_macro::TokenStream;

mod category;
mod utils;

// Tests
#[cfg(test)]
mod tests;

/// Derive macro for cohort axis enums
///
/// Generates an implementation of `crate::models::cohort::Category` together
/// with `Display`, `FromStr` and an inherent `COUNT` constant.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Category)]
/// #[category(name = "sex")]
/// pub enum Sex {
///     #[category(label = "MALE", alias = "M")]
///     Male,
///     #[category(label = "FEMALE", alias = "F")]
///     Female,
/// }
/// ```
///
/// Variants without an explicit label use their identifier in
/// `SCREAMING_SNAKE_CASE`.
#[proc_macro_derive(Category, attributes(category))]
pub fn derive_category(input: TokenStream) -> TokenStream {
    category::process_derive_category(input)
}
