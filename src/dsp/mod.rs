//! DSP Engine — a software audio graph for the tone engine.
//!
//! The graph mirrors the WebAudio primitives the engine is built on
//! (context clock, periodic-wave oscillators, automatable gains, stereo
//! panners, a looping media element) and renders them block by block, so
//! the same code runs inside an AudioWorklet (via WASM) and in native hosts.

pub mod context;
#[cfg(feature = "decode")]
pub mod decode;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod graph;
pub mod mixer;
pub mod oscillator;
pub mod panner;
pub mod param;
pub mod track;
pub mod wavetable;
