//! 🧠 `in_mem`: a sink that lives entirely in RAM, gone the moment you blink.
//!
//! Used for dry runs (`ctmx alert --dry-run`) and for every test that wants to know
//! what *would* have been sent without standing up a mock ITSM.
//!
//! ⚠️ This is not a durable store. If you're relying on it in prod, please also deploy a therapist.

mod in_mem_sink;

pub(crate) use in_mem_sink::InMemorySink;
