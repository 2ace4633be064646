// SPDX-License-Identifier: MIT

//! Bundled applications the `orra` binary can serve

pub mod hello_world;
