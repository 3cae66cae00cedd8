pub mod output;
pub mod palette;
pub mod progress;
pub mod table;

pub use output::{dim, entry_line, header, human_bytes, info, section, success, summary_row, warn};
pub use palette::{palette, Glyph, Palette};
pub use progress::{InsertProgress, Spinner};
pub use table::{entries_table, stats_table, TableBuilder};
