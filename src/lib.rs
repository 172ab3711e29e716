//! Core library for the basketlist-sync command line tools.
//!
//! The binaries copy the `oilpricechart` sheet of a workbook into its
//! `Basketlist` sheet and, optionally, export both sheets to CSV. The in-memory
//! workbook lives in [`model`], file adapters under [`io`], the clear/copy
//! routines and their orchestration in [`sync`], and the parts shared by both
//! binaries in [`cli`].

pub mod cli;
pub mod error;
pub mod io;
pub mod model;
pub mod sync;

pub use error::{Result, SyncError};
