mod asset;
pub mod compose;
pub mod overlay;
mod replicate;
mod text;
mod tree;

pub use asset::ImageAsset;
pub use compose::{ComposedPages, DrawCommand, LabelCompositor, OverlayOptions, page_number_text, plan_page};
pub use overlay::combine_pdfs;
pub use replicate::{first_page, replicate_pages};
pub use text::encode_win_ansi;
pub use tree::page_count;
