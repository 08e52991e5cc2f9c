pub mod js_unpacker;
pub mod substring;

pub use js_unpacker::JsUnpacker;
pub use substring::SubstringExtractor;
