//! Adapters between the in-memory [`Workbook`](crate::model::Workbook) and the
//! files it is loaded from and exported to.

pub mod csv_export;
pub mod excel_read;
pub mod excel_write;
pub mod layout;
