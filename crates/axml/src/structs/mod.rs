mod common;
mod res_string_pool;
mod xml_elements;

pub(crate) use common::*;
pub(crate) use res_string_pool::*;
pub use xml_elements::*;
