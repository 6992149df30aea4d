//! Statically compiled prize data from /prizes/prizes.json.
//! Generated at build time by build.rs, so the built-in table needs no
//! runtime parsing and is already validated.

include!(concat!(env!("OUT_DIR"), "/prizes_generated.rs"));
