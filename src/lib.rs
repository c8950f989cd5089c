// Control Room rail backend: multi-provider live board resolution, station
// search and route derivation behind one HTTP service.

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::let_and_return,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::op_ref,
    clippy::useless_vec
)]

pub mod board;
pub mod config;
pub mod context;
pub mod entity_search;
pub mod errors;
pub mod poller;
pub mod providers;
pub mod routes;
pub mod stations;
