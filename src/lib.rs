#![forbid(unsafe_code)]
#![warn(
    clippy::cognitive_complexity,
    clippy::dbg_macro,
    clippy::debug_assert_with_mut_call,
    clippy::doc_link_with_quotes,
    clippy::doc_markdown,
    clippy::empty_line_after_outer_attr,
    clippy::empty_structs_with_brackets,
    keyword_idents,
    clippy::missing_const_for_fn,
    missing_copy_implementations,
    missing_debug_implementations,
    clippy::mod_module_files,
    non_ascii_idents,
    noop_method_call,
    clippy::print_stderr,
    clippy::semicolon_if_nothing_returned,
    clippy::unseparated_literal_suffix,
    clippy::shadow_unrelated,
    clippy::similar_names,
    unused_crate_dependencies,
    unused_extern_crates,
    unused_import_braces,
    clippy::unused_self,
    clippy::use_debug,
    clippy::used_underscore_binding,
    clippy::useless_let_if_seq,
    clippy::wildcard_imports
)]

#[macro_use]
extern crate serde_json;

pub mod api_params;
pub mod app_state;
pub mod command_line;
pub mod content_type;
pub mod database_manager;
pub mod error;
pub mod form_parameters;
pub mod render;
pub mod sql_utils;
pub mod webserver;
pub mod wiki_query;
pub mod wiki_select;
pub mod wiki_store;

use tracing_subscriber as _;
