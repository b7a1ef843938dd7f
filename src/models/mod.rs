pub mod fields;
pub mod form;
pub mod row;
pub mod totals;

pub use fields::{ExtraFields, FooterFields};
pub use form::GenerateForm;
pub use row::Row;
pub use totals::Totals;
