// Shared byte-source and text-decoding helpers

pub mod encoding;
pub mod io;
