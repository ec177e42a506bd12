fn main() {
    if let Err(err) = scriba::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
