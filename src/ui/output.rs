use crate::entity::FileEntity;
use crate::ui::{palette, Glyph};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Glyph::ACCOUNT, text.style(palette().account));
}

pub fn success(label: &str) {
    println!("{} {}", Glyph::SAVED, label.style(palette().saved));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Glyph::CAUTION, label.style(palette().caution));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", Glyph::DETAIL, label.style(palette().muted), value);
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(palette().account));
}

pub fn dim(text: &str) -> String {
    text.style(palette().muted).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(palette().muted), value);
}

/// One listing line: glyph, name, size
pub fn entry_line(entity: &FileEntity) {
    if entity.is_folder {
        println!("{} {}/", Glyph::FOLDER, entity.name().style(palette().folder));
    } else {
        println!("{} {} {}", Glyph::FILE, entity.name(), dim(&human_bytes(entity.size)));
    }
}

pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
