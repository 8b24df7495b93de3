//! XML navigation and markup serialization over `roxmltree`.

mod utils;

pub use utils::{
    find_all_by_path, find_child, find_children, get_attribute, get_tag_name, get_text,
    inner_markup, parse_document,
};
