// Output encoding for non-UTF-8 targets, and the opt-in parallel whole-buffer
// parsing path. The other strategy families this module used to hold
// (direct/two_phase/zero_copy/streaming/general row parsers) were superseded
// by `parser::Tokenizer` and `streamer::ChunkStreamer`; see DESIGN.md for the
// trim rationale.

pub mod encoding;
pub mod parallel;
