use colored::*;
use std::io::{self, Write};

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.chars().count()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_warning(text: &str) {
    println!("{}", text.yellow());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
    let _ = io::stdout().flush();
}

/// One numbered line per song, e.g. `  3. "Title" by Artist`.
pub fn print_song_list<T: std::fmt::Display>(songs: &[T]) {
    for (i, song) in songs.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, song);
    }
}
