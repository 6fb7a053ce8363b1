fn main() {
    if let Err(e) = benchdrive::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
