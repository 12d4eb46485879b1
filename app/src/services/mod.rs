pub mod font;
pub mod watermark;
