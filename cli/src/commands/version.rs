//! Version command

/// Run the version command.
pub fn run() {
    println!("dotd {}", env!("CARGO_PKG_VERSION"));
}
