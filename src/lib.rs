//! Core library for the jlpt-history command line application.
//!
//! The pipeline turns the JLPT result workbooks published each test
//! administration into one long-format historical table. Workbook adapters
//! live under [`jlpt::results::io`], the record types in
//! [`jlpt::results::model`], the sheet reshaping logic in
//! [`jlpt::results::reshape`], the country reference data in
//! [`jlpt::results::reference`], and the stage orchestration under
//! [`jlpt::results::pipeline`].

pub mod jlpt;

pub use jlpt::results::{
    Result, ToolError, config, error, io, model, pipeline, reference, reshape,
};
